//! # Helioscope
//!
//! A small web backend for hemispherical sky imagery. Clients upload a sky
//! photo (RAW DNG, OpenEXR, PNG, or JPEG); the service normalizes it into a
//! bounded RGBA preview and gateways three black-box solar-analysis hooks
//! against that preview: a hemispherical orientation renderer, a sky-region
//! segmenter, and a solar-energy forecaster.
//!
//! # Architecture: Ingest, Store, Gateway
//!
//! ```text
//! 1. Ingest    upload bytes    →  canonical RGBA raster  (format quirks die here)
//! 2. Preview   raster          →  ≤1024px PNG artifact   (the handle for everything after)
//! 3. Gateway   handle + params →  hook → derived artifact or JSON
//! ```
//!
//! The interesting engineering is stage 1: PNG/JPEG need their EXIF
//! orientation honored, DNG needs a demosaic with camera white balance, and
//! EXR needs exposure tone-mapping from unbounded linear light down to
//! 8-bit. Everything downstream sees one canonical form and stays trivial.
//!
//! The hooks themselves are deliberately absent: they belong to a separate
//! algorithm component and are modeled as a strategy trait with an
//! "unavailable" variant. The gateway supplies graceful degradation — a
//! no-op render, a transparent mask, or an honest 501 — so the web surface
//! is fully exercisable before any algorithm exists.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Multi-format decode to canonical RGBA + preview shrink |
//! | [`store`] | Write-once filesystem artifact store with opaque handles |
//! | [`engine`] | Hook contracts: [`engine::SkyEngine`] trait, parameter/result types |
//! | [`server`] | axum routes, error taxonomy, fallback policy |
//! | [`config`] | `config.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Previews Are the Working Set
//!
//! Originals are persisted untouched but never re-read after ingestion. All
//! hook operations load the preview, which caps per-request pixel work at
//! the configured canvas bound regardless of upload size.
//!
//! ## Absence Is Data
//!
//! A hook with no implementation returns `EngineError::NotSupported` rather
//! than panicking or being probed for reflectively. The web layer matches
//! on it: render and segment degrade silently (with a log line when the
//! hook actually failed), forecast refuses with 501 because there is no
//! sensible dollar-value default.
//!
//! ## Write-Once Artifacts
//!
//! Every derived image gets a fresh UUID handle; nothing is mutated in
//! place. Concurrent requests against one handle need no locking. Storage
//! is unbounded by design — cleanup belongs to an external process.

pub mod config;
pub mod engine;
pub mod imaging;
pub mod server;
pub mod store;
