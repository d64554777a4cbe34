//! iQmetrix dropship channel adapter.
//!
//! Translates between the e-commerce hub calling convention (query documents,
//! hub payloads, standardized status codes) and the iQmetrix dropship REST
//! API. Every hub operation is a method on [`DropshipChannel`] that validates
//! its input, issues one or more vendor calls, and reshapes the result into an
//! [`Envelope`](iqmetrix_dropship_core::Envelope).
//!
//! # Modules
//!
//! - [`config`] - Channel profile validation and environment overrides
//! - [`client`] - Bearer-authenticated JSON client for the vendor services
//! - [`error`] - Error taxonomy and hub status mapping
//! - [`document`] - Helpers for pass-through vendor documents
//! - [`customers`], [`extract`], [`products`], [`quantity`], [`pricing`],
//!   [`orders`], [`fulfillment`], [`payment_capture`] - Operation handlers
//! - [`operations`] - Hub operation names and dispatch
//!
//! # API Reference
//!
//! - Base URL: `{protocol}://{service}{environment}.iqmetrix.net`
//! - Authentication: `Authorization: Bearer <access_token>`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod channel;
pub mod client;
pub mod config;
pub mod customers;
pub mod document;
pub mod error;
pub mod extract;
pub mod fulfillment;
pub mod operations;
pub mod orders;
pub mod payment_capture;
pub mod pricing;
pub mod products;
pub mod quantity;

pub use channel::DropshipChannel;
pub use client::{DropshipClient, Reply, Service};
pub use config::{BusinessReferences, ChannelConfig, ConfigError};
pub use document::Document;
pub use error::ChannelError;
pub use operations::{Operation, QueryMode, Resource, UnknownOperation};
