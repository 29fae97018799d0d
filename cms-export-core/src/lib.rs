#![doc = "cms-export-core: traversal and extraction logic for cms-export."]

//! This crate walks a CMS section tree through a [`contract::RemoteClient`]
//! session and mirrors it onto the local filesystem: a metadata fragment per
//! node, plus draft and published bodies for pages, layouts and partials.
//! It holds no browser code; the binary crate supplies the session.
//!
//! # Usage
//! Sign in with [`mirror::sign_in`], then run [`mirror::export_all`] or
//! [`mirror::export_single`] and inspect the returned [`report::ExportReport`].

pub mod config;
pub mod contract;
pub mod export;
pub mod mirror;
pub mod node;
pub mod parser;
pub mod paths;
pub mod report;
pub mod walker;
