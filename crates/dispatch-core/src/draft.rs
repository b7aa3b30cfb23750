//! The in-progress order being authored

use std::path::Path;

use time::Date;
use tracing::debug;

use crate::pricing::PricingSummary;
use crate::{
    BoxCount, Catalog, CoreError, Discount, ImageRef, ItemId, ItemPayload, LineItem,
    LineItemRegistry, OrderPayload, PacketAllocator, PacketPayload, PendingImage, PersistedOrder,
    Result, Violation,
};

/// A pending image waiting in the upload queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub item_id: ItemId,
    pub item_index: usize,
    pub image_index: usize,
    pub image: PendingImage,
}

/// Dispatch order draft.
///
/// Items and their packets are mutated through [`LineItemRegistry`];
/// everything else through the setters here.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    date: Date,
    logistics_company_id: Option<String>,
    items: LineItemRegistry,
    box_count: BoxCount,
    discount: Discount,
}

impl OrderDraft {
    pub fn new(date: Date) -> Self {
        Self {
            date,
            logistics_company_id: None,
            items: LineItemRegistry::new(),
            box_count: BoxCount::default(),
            discount: Discount::default(),
        }
    }

    /// Rebuild an editable draft from a stored order
    pub fn hydrate(order: &PersistedOrder, catalog: &Catalog) -> Result<Self> {
        if !order.status.is_editable() {
            return Err(CoreError::NotEditable(order.status));
        }
        let payload = &order.payload;
        let mut draft = Self::new(payload.date);
        draft.logistics_company_id = payload.logistics_company_id.clone();
        draft.box_count = BoxCount::new(payload.box_count);
        draft.discount = payload.discount;

        for (index, stored) in payload.items.iter().enumerate() {
            let item = LineItem {
                name: stored.name.clone(),
                code: stored.code.clone(),
                type_id: stored.type_id.clone(),
                product_id: stored.product_id.clone(),
                unit_cost: stored.unit_cost,
                colors: stored.colors.clone(),
                sizes: stored.sizes.clone(),
                quantity: stored.quantity,
            };
            let images = catalog.resolve_images(&stored.images, stored.product_id.as_deref());
            draft.items.insert_hydrated(item, images)?;
            if let Some(packets) = &stored.packets {
                let allocator = PacketAllocator::from_parts(packets.mode, packets.packets.clone());
                draft.items.set_packets(index, allocator)?;
            }
        }
        draft.items.restore_previews();

        debug!(order_id = %order.id, items = draft.items.len(), "hydrated order draft");
        Ok(draft)
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn set_date(&mut self, date: Date) {
        self.date = date;
    }

    pub fn logistics_company_id(&self) -> Option<&str> {
        self.logistics_company_id.as_deref()
    }

    pub fn set_logistics_company(&mut self, id: Option<String>) {
        self.logistics_company_id = id.filter(|s| !s.trim().is_empty());
    }

    pub fn items(&self) -> &LineItemRegistry {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut LineItemRegistry {
        &mut self.items
    }

    pub fn box_count(&self) -> BoxCount {
        self.box_count
    }

    pub fn set_box_count(&mut self, count: u32) {
        self.box_count = BoxCount::new(count);
    }

    pub fn discount(&self) -> Discount {
        self.discount
    }

    pub fn set_discount(&mut self, discount: Discount) {
        self.discount = discount;
    }

    pub fn pricing(&self) -> PricingSummary {
        PricingSummary::compute(self.items.iter(), &self.discount)
    }

    /// Every outstanding violation, without mutating anything
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.items.is_empty() {
            violations.push(Violation::NoLineItems);
        }
        if self.logistics_company_id.is_none() {
            violations.push(Violation::LogisticsCompanyRequired);
        }
        violations.extend(self.box_count.validate());
        violations.extend(self.items.validate_allocations());
        violations.extend(self.discount.validate(self.pricing().grand_total));
        violations
    }

    /// [`validate`](Self::validate) plus lookups against the catalog
    pub fn validate_with_catalog(&self, catalog: &Catalog) -> Vec<Violation> {
        let mut violations = self.validate();
        if let Some(id) = &self.logistics_company_id {
            if catalog.logistics_company(id).is_none() {
                violations.push(Violation::UnknownLogisticsCompany { id: id.clone() });
            }
        }
        for (item_index, item) in self.items.iter().enumerate() {
            if catalog.product_type(&item.type_id).is_none() {
                violations.push(Violation::UnknownProductType {
                    item_index,
                    name: item.name.clone(),
                    type_id: item.type_id.clone(),
                });
            }
        }
        violations
    }

    /// Stored form of the draft; pending files are left out
    pub fn to_payload(&self) -> OrderPayload {
        let pricing = self.pricing();
        let items = (0..self.items.len())
            .filter_map(|index| {
                let item = self.items.get(index)?;
                Some(ItemPayload {
                    name: item.name.clone(),
                    code: item.code.clone(),
                    type_id: item.type_id.clone(),
                    product_id: item.product_id.clone(),
                    unit_cost: item.unit_cost,
                    colors: item.colors.clone(),
                    sizes: item.sizes.clone(),
                    quantity: item.quantity,
                    images: self
                        .items
                        .images_at(index)
                        .iter()
                        .filter_map(|i| i.url().map(str::to_string))
                        .collect(),
                    packets: self.items.packets_at(index).map(|a| PacketPayload {
                        mode: a.mode(),
                        packets: a.compositions(),
                    }),
                })
            })
            .collect();

        OrderPayload {
            date: self.date,
            logistics_company_id: self.logistics_company_id.clone(),
            items,
            box_count: self.box_count.get(),
            discount: self.discount,
            grand_total: pricing.grand_total,
            discount_amount: pricing.discount_amount,
            final_amount: pricing.final_amount,
        }
    }

    /// Pending images in line-item order, then image order
    pub fn pending_uploads(&self) -> Vec<PendingUpload> {
        let mut uploads = Vec::new();
        for item_index in 0..self.items.len() {
            let Some(item_id) = self.items.id_at(item_index) else {
                continue;
            };
            for (image_index, image) in self.items.images_at(item_index).iter().enumerate() {
                if let ImageRef::Pending(pending) = image {
                    uploads.push(PendingUpload {
                        item_id,
                        item_index,
                        image_index,
                        image: pending.clone(),
                    });
                }
            }
        }
        uploads
    }

    /// Record a finished upload so the next save stores its URL
    pub fn mark_uploaded(&mut self, item_id: ItemId, path: &Path, url: &str) -> bool {
        self.items.mark_uploaded(item_id, path, url)
    }
}
