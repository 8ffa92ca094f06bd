//! Core infrastructure for auklet.
//!
//! This crate provides the language-agnostic pieces shared by the analysis
//! and mutation layers as well as by search-engine consumers:
//! - A deterministic, insertion-order-preserving unique collection

pub mod orderedset;

pub use orderedset::OrderedSet;
