//! Line item registry
//!
//! Items are presented positionally, but every item gets a permanent
//! [`ItemId`] when it is inserted and all per-item side state (images,
//! previews, packet configuration) is keyed by that id. Removing an item
//! therefore only discards that id's entries; later items move down one
//! position without any re-keying.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::matrix::CompositionMatrix;
use crate::{
    CompositionEntry, CoreError, ImageRef, PacketAllocator, PacketMode, PendingImage, Result,
    Violation,
};

/// Permanent identity of a line item within one draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u64);

/// One product entry in an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub code: String,
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        type_id: impl Into<String>,
        unit_cost: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            type_id: type_id.into(),
            product_id: None,
            unit_cost,
            colors: Vec::new(),
            sizes: Vec::new(),
            quantity,
        }
    }

    pub fn with_colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sizes<S: Into<String>>(mut self, sizes: impl IntoIterator<Item = S>) -> Self {
        self.sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }
}

/// A single-field edit of a line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemField {
    Name(String),
    Code(String),
    TypeId(String),
    ProductId(Option<String>),
    UnitCost(Decimal),
    Colors(Vec<String>),
    Sizes(Vec<String>),
    Quantity(u32),
}

impl ItemField {
    /// Whether the edit changes pricing inputs
    pub fn affects_pricing(&self) -> bool {
        matches!(self, Self::UnitCost(_) | Self::Quantity(_))
    }
}

/// Per-item state that must always move together
#[derive(Debug, Clone, Default)]
struct SideMaps {
    images: HashMap<ItemId, Vec<ImageRef>>,
    previews: HashMap<ItemId, Vec<String>>,
    packets: HashMap<ItemId, PacketAllocator>,
}

impl SideMaps {
    /// Fresh maps holding every entry except `removed`'s
    fn without(&self, removed: ItemId) -> Self {
        Self {
            images: self
                .images
                .iter()
                .filter(|(id, _)| **id != removed)
                .map(|(id, v)| (*id, v.clone()))
                .collect(),
            previews: self
                .previews
                .iter()
                .filter(|(id, _)| **id != removed)
                .map(|(id, v)| (*id, v.clone()))
                .collect(),
            packets: self
                .packets
                .iter()
                .filter(|(id, _)| **id != removed)
                .map(|(id, v)| (*id, v.clone()))
                .collect(),
        }
    }
}

/// Ordered line items plus their side state
#[derive(Debug, Clone, Default)]
pub struct LineItemRegistry {
    next_id: u64,
    order: Vec<ItemId>,
    items: HashMap<ItemId, LineItem>,
    side: SideMaps,
    /// Images resolved at hydration; never mutated afterwards
    reference_images: HashMap<ItemId, Vec<String>>,
}

impl LineItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LineItem> {
        self.order.get(index).and_then(|id| self.items.get(id))
    }

    pub fn id_at(&self, index: usize) -> Option<ItemId> {
        self.order.get(index).copied()
    }

    /// Items in display order
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Append an item with empty side state and return its id
    pub fn insert(&mut self, item: LineItem) -> Result<ItemId> {
        if item.quantity == 0 {
            return Err(CoreError::InvalidQuantity);
        }
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        self.items.insert(id, item);
        self.side.images.insert(id, Vec::new());
        self.side.previews.insert(id, Vec::new());
        Ok(id)
    }

    /// Insert a persisted item together with its already-uploaded images.
    ///
    /// The images also go into the reference table used by
    /// [`restore_previews`](Self::restore_previews).
    pub fn insert_hydrated(&mut self, item: LineItem, existing_images: Vec<String>) -> Result<ItemId> {
        let id = self.insert(item)?;
        self.side.images.insert(
            id,
            existing_images.iter().cloned().map(ImageRef::existing).collect(),
        );
        self.side.previews.insert(id, existing_images.clone());
        self.reference_images.insert(id, existing_images);
        Ok(id)
    }

    /// Remove the item at `index` and all of its side state
    pub fn remove_at(&mut self, index: usize) -> Result<LineItem> {
        let id = self.require(index)?;
        let side = self.side.without(id);
        let mut order = self.order.clone();
        order.remove(index);

        let item = self.items.remove(&id).ok_or(CoreError::ItemNotFound(index))?;
        self.order = order;
        self.side = side;
        self.reference_images.remove(&id);
        Ok(item)
    }

    /// Edit one field. Returns true when pricing inputs changed.
    pub fn update_field(&mut self, index: usize, field: ItemField) -> Result<bool> {
        let id = self.require(index)?;
        let allocated = self
            .side
            .packets
            .get(&id)
            .map(PacketAllocator::grand_total)
            .unwrap_or(0);
        if let ItemField::Quantity(quantity) = field {
            if quantity == 0 {
                return Err(CoreError::InvalidQuantity);
            }
            if allocated > u64::from(quantity) {
                return Err(CoreError::AllocationExceeded {
                    declared: quantity,
                    requested: allocated,
                });
            }
        }

        let affects_pricing = field.affects_pricing();
        let Some(item) = self.items.get_mut(&id) else {
            return Err(CoreError::ItemNotFound(index));
        };
        match field {
            ItemField::Name(v) => item.name = v,
            ItemField::Code(v) => item.code = v,
            ItemField::TypeId(v) => item.type_id = v,
            ItemField::ProductId(v) => item.product_id = v,
            ItemField::UnitCost(v) => item.unit_cost = v,
            ItemField::Quantity(v) => item.quantity = v,
            ItemField::Colors(v) => item.colors = v,
            ItemField::Sizes(v) => item.sizes = v,
        }
        if let Some(allocator) = self.side.packets.get_mut(&id) {
            allocator.retain_cells(&item.colors, &item.sizes);
        }
        Ok(affects_pricing)
    }

    // ---------------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------------

    pub fn images_at(&self, index: usize) -> &[ImageRef] {
        self.id_at(index)
            .and_then(|id| self.side.images.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn previews_at(&self, index: usize) -> &[String] {
        self.id_at(index)
            .and_then(|id| self.side.previews.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_pending_image(&mut self, index: usize, image: PendingImage) -> Result<()> {
        self.push_image(index, ImageRef::Pending(image))
    }

    pub fn add_existing_image(&mut self, index: usize, url: impl Into<String>) -> Result<()> {
        self.push_image(index, ImageRef::existing(url))
    }

    /// Remove one image; remaining images keep their order.
    ///
    /// A removed hydrated URL is also dropped from the reference table so
    /// [`restore_previews`](Self::restore_previews) never brings it back.
    pub fn remove_image(&mut self, index: usize, image_index: usize) -> Result<ImageRef> {
        let id = self.require(index)?;
        let images = self.side.images.entry(id).or_default();
        if image_index >= images.len() {
            return Err(CoreError::ImageNotFound(image_index));
        }
        let removed = images.remove(image_index);
        let previews = self.side.previews.entry(id).or_default();
        if image_index < previews.len() {
            previews.remove(image_index);
        }
        if let (Some(url), Some(reference)) = (removed.url(), self.reference_images.get_mut(&id)) {
            if let Some(position) = reference.iter().position(|u| u == url) {
                reference.remove(position);
            }
        }
        Ok(removed)
    }

    /// Replace a pending image with its uploaded URL.
    ///
    /// Returns false when no pending image with that path remains.
    pub fn mark_uploaded(&mut self, id: ItemId, path: &std::path::Path, url: &str) -> bool {
        let Some(images) = self.side.images.get_mut(&id) else {
            return false;
        };
        let Some(position) = images
            .iter()
            .position(|i| matches!(i, ImageRef::Pending(p) if p.path == path))
        else {
            return false;
        };
        images[position] = ImageRef::existing(url);
        if let Some(preview) = self
            .side
            .previews
            .get_mut(&id)
            .and_then(|p| p.get_mut(position))
        {
            *preview = url.to_string();
        }
        true
    }

    /// Refill empty preview lists from the hydration reference table.
    ///
    /// Only ids that still have reference images and currently show no
    /// previews are touched. Images the user removed are gone from the
    /// reference table, so they stay removed. Returns how many lists were
    /// restored; a second call restores nothing.
    pub fn restore_previews(&mut self) -> usize {
        let mut restored = 0;
        for (id, urls) in &self.reference_images {
            if urls.is_empty() || !self.items.contains_key(id) {
                continue;
            }
            let previews = self.side.previews.entry(*id).or_default();
            if !previews.is_empty() {
                continue;
            }
            let images = self.side.images.entry(*id).or_default();
            if images.is_empty() {
                images.extend(urls.iter().cloned().map(ImageRef::existing));
            }
            previews.extend(images.iter().map(ImageRef::preview_source));
            restored += 1;
        }
        restored
    }

    fn push_image(&mut self, index: usize, image: ImageRef) -> Result<()> {
        let id = self.require(index)?;
        self.side
            .previews
            .entry(id)
            .or_default()
            .push(image.preview_source());
        self.side.images.entry(id).or_default().push(image);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Packets
    // ---------------------------------------------------------------------

    pub fn packets_at(&self, index: usize) -> Option<&PacketAllocator> {
        self.id_at(index).and_then(|id| self.side.packets.get(&id))
    }

    /// Open the packet editor for an item, creating a default configuration
    /// on first use
    pub fn open_packets(&mut self, index: usize) -> Result<&PacketAllocator> {
        let id = self.require(index)?;
        let allocator: &PacketAllocator = self.side.packets.entry(id).or_default();
        Ok(allocator)
    }

    /// Install a complete configuration, e.g. when hydrating
    pub fn set_packets(&mut self, index: usize, allocator: PacketAllocator) -> Result<()> {
        let (id, item) = self.require_item(index)?;
        let requested = allocator.grand_total();
        if requested > u64::from(item.quantity) {
            return Err(CoreError::AllocationExceeded {
                declared: item.quantity,
                requested,
            });
        }
        self.side.packets.insert(id, allocator);
        Ok(())
    }

    pub fn add_packet(&mut self, index: usize) -> Result<usize> {
        self.allocator_mut(index)?.add_packet()
    }

    pub fn remove_packet(&mut self, index: usize, packet: usize) -> Result<()> {
        self.allocator_mut(index)?.remove_packet(packet)
    }

    pub fn duplicate_packet(&mut self, index: usize, packet: usize) -> Result<usize> {
        let declared = self.require_item(index)?.1.quantity;
        self.allocator_mut(index)?.duplicate_packet(packet, declared)
    }

    pub fn switch_mode(&mut self, index: usize, mode: PacketMode) -> Result<()> {
        self.allocator_mut(index)?.switch_mode(mode);
        Ok(())
    }

    /// Replace a packet's composition with a sparse list.
    ///
    /// The list is normalised through the item's composition matrix, so
    /// cells outside its colors and sizes are rejected and zero cells are
    /// dropped.
    pub fn set_composition(
        &mut self,
        index: usize,
        packet: usize,
        entries: &[CompositionEntry],
    ) -> Result<()> {
        let (_, item) = self.require_item(index)?;
        let matrix = CompositionMatrix::from_sparse_list(&item.colors, &item.sizes, entries)?;
        let declared = item.quantity;
        self.allocator_mut(index)?
            .set_composition(packet, matrix.to_sparse_list(), declared)
    }

    /// Set one cell of a packet's matrix and push the result to the allocator
    pub fn set_cell(
        &mut self,
        index: usize,
        packet: usize,
        color: &str,
        size: &str,
        quantity: i64,
    ) -> Result<()> {
        let mut matrix = self.matrix(index, packet)?;
        matrix.set_cell(color, size, quantity)?;
        let declared = self.require_item(index)?.1.quantity;
        self.allocator_mut(index)?
            .set_composition(packet, matrix.to_sparse_list(), declared)
    }

    /// The composition matrix of one packet
    pub fn matrix(&self, index: usize, packet: usize) -> Result<CompositionMatrix> {
        let (id, item) = self.require_item(index)?;
        let allocator = self
            .side
            .packets
            .get(&id)
            .ok_or(CoreError::NoPacketConfiguration(index))?;
        let packet = allocator
            .packet(packet)
            .ok_or(CoreError::PacketNotFound(packet))?;
        CompositionMatrix::from_sparse_list(&item.colors, &item.sizes, &packet.composition)
    }

    /// Submission check of every configured item
    pub fn validate_allocations(&self) -> Vec<Violation> {
        self.order
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let item = self.items.get(id)?;
                let allocator = self.side.packets.get(id)?;
                match allocator.validate_for_submission(item.quantity) {
                    Err(CoreError::QuantityMismatch {
                        declared,
                        allocated,
                    }) => Some(Violation::QuantityMismatch {
                        item_index: index,
                        name: item.name.clone(),
                        declared,
                        allocated,
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    fn allocator_mut(&mut self, index: usize) -> Result<&mut PacketAllocator> {
        let id = self.require(index)?;
        self.side
            .packets
            .get_mut(&id)
            .ok_or(CoreError::NoPacketConfiguration(index))
    }

    fn require(&self, index: usize) -> Result<ItemId> {
        self.id_at(index).ok_or(CoreError::ItemNotFound(index))
    }

    fn require_item(&self, index: usize) -> Result<(ItemId, &LineItem)> {
        let id = self.require(index)?;
        let item = self.items.get(&id).ok_or(CoreError::ItemNotFound(index))?;
        Ok((id, item))
    }
}
