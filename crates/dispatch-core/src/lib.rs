//! Core domain models and logic for dispatch orders
//!
//! This crate contains:
//! - Composition matrices (size x color breakdown of a line item)
//! - Packet allocation (packets or a single loose pool per line item)
//! - The line item registry and its per-item side state
//! - Pricing, discount and box count validation
//! - The order draft, its persisted payload and edit-mode hydration
//! - Contracts for the order store and image transport collaborators

pub mod backend;
pub mod boxes;
pub mod catalog;
pub mod draft;
pub mod error;
pub mod image;
pub mod matrix;
pub mod order;
pub mod packet;
pub mod pricing;
pub mod registry;
pub mod violation;

pub use backend::{ImageTransport, OrderStore, UploadedImage};
pub use boxes::BoxCount;
pub use catalog::{Catalog, LogisticsCompany, Product, ProductType};
pub use draft::{OrderDraft, PendingUpload};
pub use error::{CoreError, Result};
pub use image::{ImageRef, PendingImage};
pub use matrix::{CompositionEntry, CompositionMatrix};
pub use order::{ItemPayload, OrderId, OrderPayload, OrderStatus, PacketPayload, PersistedOrder};
pub use packet::{Packet, PacketAllocator, PacketMode};
pub use pricing::{Discount, DiscountKind, PricingSummary};
pub use registry::{ItemField, ItemId, LineItem, LineItemRegistry};
pub use violation::Violation;
