#![doc = "tumblr-sync-core: core logic library for tumblr-sync."]

//! Turns blog posts into Jekyll posts and commits them to a site repository.
//! This crate holds the data model, the content pipeline and the contracts for
//! the two remote APIs; the HTTP clients live in the `tumblr-sync` crate.
//!
//! # Usage
//! Implement [`contract::PostSource`] and [`contract::GitHost`], build a
//! [`synchronise::SynchroniseConfig`] (usually from [`config::Settings`]) and
//! call [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod dedup;
pub mod normalize;
pub mod post;
pub mod publish;
pub mod render;
pub mod route;
pub mod synchronise;
