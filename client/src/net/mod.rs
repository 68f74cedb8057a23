//! Networking modules for the annotation API and static page files.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` speaks HTTP to the annotation service and the static file tree;
//! `backend` picks between it and the in-process mock for the overlay engine.

pub mod api;
pub mod backend;
