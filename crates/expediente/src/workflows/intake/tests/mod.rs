mod common;
mod portal;
mod service;
