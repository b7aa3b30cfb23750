//! Draft description files
//!
//! A draft file is TOML. Everything in it is applied through the registry
//! API, so a file that over-allocates an item is rejected while loading.
//!
//! ```toml
//! date = "2026-10-16"
//! logistics_company_id = "lc-1"
//! box_count = 3
//! discount = { kind = "percent", value = 10 }
//!
//! [[items]]
//! name = "Polo"
//! code = "POLO-1"
//! type_id = "shirts"
//! unit_cost = "12.50"
//! quantity = 10
//! colors = ["red", "blue"]
//! sizes = ["S", "M"]
//! images = ["photos/polo-front.jpg"]
//!
//! [items.packets]
//! mode = "packets"
//! compositions = [
//!     [{ color = "red", size = "S", quantity = 4 }],
//!     [{ color = "blue", size = "M", quantity = 6 }],
//! ]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dispatch_core::order::iso_date;
use dispatch_core::{CompositionEntry, Discount, LineItem, OrderDraft, PacketMode, PendingImage};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Deserialize)]
pub struct DraftFile {
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
    #[serde(default)]
    pub logistics_company_id: Option<String>,
    #[serde(default)]
    pub box_count: u32,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub items: Vec<ItemEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemEntry {
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub type_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub unit_cost: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Local files, relative to the draft file
    #[serde(default)]
    pub images: Vec<PathBuf>,
    /// Already stored image URLs
    #[serde(default)]
    pub existing_images: Vec<String>,
    #[serde(default)]
    pub packets: Option<PacketsEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PacketsEntry {
    #[serde(default)]
    pub mode: PacketMode,
    #[serde(default)]
    pub compositions: Vec<Vec<CompositionEntry>>,
}

impl DraftFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read draft file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid draft file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the draft, resolving image paths against `base_dir`
    pub fn into_draft(self, base_dir: &Path) -> Result<OrderDraft> {
        let date = self.date.unwrap_or_else(|| OffsetDateTime::now_utc().date());
        let mut draft = OrderDraft::new(date);
        draft.set_logistics_company(self.logistics_company_id);
        draft.set_box_count(self.box_count);
        draft.set_discount(self.discount);

        for (index, entry) in self.items.into_iter().enumerate() {
            apply_item(&mut draft, index, entry, base_dir)
                .with_context(|| format!("items[{index}]"))?;
        }
        Ok(draft)
    }
}

fn apply_item(
    draft: &mut OrderDraft,
    index: usize,
    entry: ItemEntry,
    base_dir: &Path,
) -> Result<()> {
    let mut item = LineItem::new(
        entry.name,
        entry.code,
        entry.type_id,
        entry.unit_cost,
        entry.quantity,
    )
    .with_colors(entry.colors)
    .with_sizes(entry.sizes);
    if let Some(product_id) = entry.product_id {
        item = item.with_product(product_id);
    }

    let items = draft.items_mut();
    items.insert(item)?;
    for url in entry.existing_images {
        items.add_existing_image(index, url)?;
    }
    for path in entry.images {
        items.add_pending_image(index, PendingImage::new(base_dir.join(path)))?;
    }

    let Some(packets) = entry.packets else {
        return Ok(());
    };
    items.open_packets(index)?;
    if packets.mode == PacketMode::Loose {
        if packets.compositions.len() > 1 {
            bail!(
                "loose mode takes a single composition, got {}",
                packets.compositions.len()
            );
        }
        items.switch_mode(index, PacketMode::Loose)?;
    }
    for (packet, composition) in packets.compositions.iter().enumerate() {
        if packet > 0 {
            items.add_packet(index)?;
        }
        items.set_composition(index, packet, composition)?;
    }
    Ok(())
}
