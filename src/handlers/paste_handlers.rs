//! HTTP handlers for submitting and reading pastes.
//! Storage concerns are delegated to `PasteService`; this module only decodes
//! forms and shapes responses.

use crate::{errors::AppError, models::paste::Paste, services::paste_service::PasteService};
use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use bytes::Bytes;
use percent_encoding::percent_decode;
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, info};

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>binnit</title></head>
<body>
<form method="post" action="/">
<p><input type="text" name="title" placeholder="Title"> <input type="text" name="lang" placeholder="Language"></p>
<p><textarea name="paste" rows="25" cols="80"></textarea></p>
<p><input type="hidden" name="show" value="1"><input type="submit" value="Paste"></p>
</form>
</body>
</html>
"#;

/// Fields accepted by `POST /`, either url-encoded or multipart.
///
/// `paste` keeps the submitted bytes untouched; the other fields are decoded
/// as (lossy) UTF-8.
#[derive(Debug, Default)]
pub struct PasteForm {
    pub title: String,
    pub lang: String,
    pub paste: Bytes,
    pub show: String,
}

impl PasteForm {
    fn from_urlencoded(body: &[u8]) -> Self {
        let mut form = Self::default();
        for pair in body.split(|&b| b == b'&').filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.iter().position(|&b| b == b'=') {
                Some(idx) => (&pair[..idx], &pair[idx + 1..]),
                None => (pair, &[][..]),
            };
            let value = decode_component(value);
            match decode_component(key).as_slice() {
                b"paste" => form.paste = Bytes::from(value),
                b"title" => form.title = String::from_utf8_lossy(&value).into_owned(),
                b"lang" => form.lang = String::from_utf8_lossy(&value).into_owned(),
                b"show" => form.show = String::from_utf8_lossy(&value).into_owned(),
                other => debug!("ignoring form field `{}`", String::from_utf8_lossy(other)),
            }
        }
        form
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let value = field
                .bytes()
                .await
                .map_err(|err| AppError::bad_request(err.body_text()))?;
            match name.as_str() {
                "paste" => form.paste = value,
                "title" => form.title = String::from_utf8_lossy(&value).into_owned(),
                "lang" => form.lang = String::from_utf8_lossy(&value).into_owned(),
                "show" => form.show = String::from_utf8_lossy(&value).into_owned(),
                _ => debug!("ignoring form field `{}`", name),
            }
        }
        Ok(form)
    }
}

/// `GET /` — `index.html` from the template dir, or the built-in form.
pub async fn index(State(service): State<PasteService>) -> Result<Response, AppError> {
    let path = service.config().templ_dir.join("index.html");
    match fs::read_to_string(&path).await {
        Ok(page) => Ok(Html(page).into_response()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Html(DEFAULT_INDEX).into_response()),
        Err(err) => Err(AppError::internal(format!(
            "reading {}: {}",
            path.display(),
            err
        ))),
    }
}

/// `POST /` — store a paste and answer with its link.
pub async fn submit_paste(
    State(service): State<PasteService>,
    request: Request,
) -> Result<Response, AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let form = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &service)
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;
        PasteForm::from_multipart(multipart).await?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let body = Bytes::from_request(request, &service)
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;
        PasteForm::from_urlencoded(&body)
    } else {
        return Err(AppError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected a url-encoded or multipart form",
        ));
    };

    info!(title = %form.title, lang = %form.lang, "received new paste");

    let name = service
        .submit(&form.title, &form.lang, form.paste)
        .await?;
    let link = service.link(&name);

    if form.show == "1" {
        let link = html_escape(&link);
        Ok(Html(format!(
            "<html><body>Link: <a href='{link}'>{link}</a></body></html>"
        ))
        .into_response())
    } else {
        Ok(format!("{link}\n").into_response())
    }
}

/// `GET /{id}` — the paste rendered as an HTML page.
pub async fn get_paste(
    State(service): State<PasteService>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    info!("received GET for paste '{}'", id);
    let paste = service.fetch(&id).await?;
    Ok(Html(render_paste(&paste, &service.link(&id))))
}

/// `GET /{id}/raw` — the paste body exactly as stored.
pub async fn get_raw_paste(
    State(service): State<PasteService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    info!("received GET for raw paste '{}'", id);
    let paste = service.fetch(&id).await?;

    let mut response = Response::new(Body::from(paste.content));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Ok(response)
}

/// `GET /static/{file}` — a file from the static dir.
pub async fn get_static(
    State(service): State<PasteService>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    if file.starts_with('.') || file.contains(['/', '\\']) {
        return Err(AppError::not_found(format!("static file `{}` not found", file)));
    }

    let path = service.config().static_dir.join(&file);
    let data = match fs::read(&path).await {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(AppError::not_found(format!("static file `{}` not found", file)));
        }
        Err(err) => {
            return Err(AppError::internal(format!(
                "reading {}: {}",
                path.display(),
                err
            )));
        }
    };

    let mut response = Response::new(Body::from(data));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file)),
    );
    Ok(response)
}

/// Paths browsers ask for that the service does not provide.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn render_paste(paste: &Paste, link: &str) -> String {
    let title = html_escape(&paste.title);
    let date = html_escape(&paste.date);
    let language = html_escape(&paste.language);
    let content = html_escape(&String::from_utf8_lossy(&paste.content));
    let link = html_escape(link);

    format!(
        concat!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n",
            "<body>\n<h1>{title}</h1>\n",
            "<p>Date: {date} | Language: {language} | <a href=\"{link}/raw\">raw</a></p>\n",
            "<pre class=\"lang-{language}\">{content}</pre>\n",
            "</body>\n</html>\n"
        ),
        title = title,
        date = date,
        language = language,
        link = link,
        content = content,
    )
}

/// Decode one url-encoded form component to raw bytes, `+` meaning space.
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, ext)| ext) {
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("html") => "text/html; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_escapes_every_field() {
        let paste = Paste::new("<b>", "now", "x\"y", "if a < b && c > d {}");
        let page = render_paste(&paste, "http://localhost/0123456789abcdef");

        assert!(page.contains("<title>&lt;b&gt;</title>"));
        assert!(page.contains("class=\"lang-x&quot;y\""));
        assert!(page.contains("if a &lt; b &amp;&amp; c &gt; d {}"));
        assert!(page.contains("href=\"http://localhost/0123456789abcdef/raw\""));
    }

    #[test]
    fn urlencoded_paste_keeps_raw_bytes() {
        let form = PasteForm::from_urlencoded(b"title=a+b%21&paste=a%FF%FEz+%2B&show=1&extra");

        assert_eq!(form.title, "a b!");
        assert_eq!(&form.paste[..], b"a\xff\xfez +");
        assert_eq!(form.show, "1");
        assert_eq!(form.lang, "");
    }

    #[test]
    fn static_content_types() {
        assert_eq!(content_type_for("binnit.css"), "text/css");
        assert_eq!(content_type_for("logo.png"), "image/png");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }
}
