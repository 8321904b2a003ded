pub mod paste_service;
