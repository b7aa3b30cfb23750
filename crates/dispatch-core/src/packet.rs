//! Packet allocation for a single line item
//!
//! A line item's units are either split across numbered packets (cartons
//! packed heterogeneously) or kept as one loose pool. The allocator never
//! lets the packets hold more units than the item declares, and switching
//! between the two modes never drops units.

use serde::{Deserialize, Serialize};

use crate::matrix::{CompositionEntry, sparse_total};
use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketMode {
    #[default]
    Packets,
    Loose,
}

/// A physical sub-grouping of a line item's units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub packet_number: u32,
    pub composition: Vec<CompositionEntry>,
    pub total_items: u64,
    pub is_loose: bool,
}

impl Packet {
    fn new(packet_number: u32, composition: Vec<CompositionEntry>, is_loose: bool) -> Self {
        Self {
            packet_number,
            total_items: sparse_total(&composition),
            composition,
            is_loose,
        }
    }
}

/// Packet configuration of one line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketAllocator {
    mode: PacketMode,
    packets: Vec<Packet>,
}

impl PacketAllocator {
    /// Packets mode with a single empty packet
    pub fn new() -> Self {
        Self::empty(PacketMode::Packets)
    }

    pub fn empty(mode: PacketMode) -> Self {
        Self {
            mode,
            packets: vec![Packet::new(1, Vec::new(), mode == PacketMode::Loose)],
        }
    }

    /// Rebuild an allocator from persisted compositions.
    ///
    /// Packets are renumbered from 1. A loose configuration with several
    /// compositions is merged into one pool.
    pub fn from_parts(mode: PacketMode, compositions: Vec<Vec<CompositionEntry>>) -> Self {
        if compositions.is_empty() {
            return Self::empty(mode);
        }
        let packets = compositions
            .into_iter()
            .enumerate()
            .map(|(i, composition)| Packet::new(i as u32 + 1, composition, false))
            .collect();
        let allocator = Self {
            mode: PacketMode::Packets,
            packets,
        };
        allocator.switched(mode)
    }

    pub fn mode(&self) -> PacketMode {
        self.mode
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn packet(&self, index: usize) -> Option<&Packet> {
        self.packets.get(index)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Units allocated across every packet
    pub fn grand_total(&self) -> u64 {
        self.packets.iter().map(|p| p.total_items).sum()
    }

    /// True when at least one packet holds units
    pub fn has_allocation(&self) -> bool {
        self.packets.iter().any(|p| p.total_items > 0)
    }

    /// Append an empty packet and return its index
    pub fn add_packet(&mut self) -> Result<usize> {
        self.ensure_packets_mode()?;
        let number = self.packets.len() as u32 + 1;
        self.packets.push(Packet::new(number, Vec::new(), false));
        Ok(self.packets.len() - 1)
    }

    /// Remove a packet and renumber the rest from 1
    pub fn remove_packet(&mut self, index: usize) -> Result<()> {
        if index >= self.packets.len() {
            return Err(CoreError::PacketNotFound(index));
        }
        if self.packets.len() == 1 {
            return Err(CoreError::LastPacket);
        }
        self.packets.remove(index);
        self.renumber();
        Ok(())
    }

    /// Copy a packet's composition into a new trailing packet.
    ///
    /// The copy owns its entries; editing either packet leaves the other
    /// alone. Rejected when the copied units would exceed `declared`.
    pub fn duplicate_packet(&mut self, index: usize, declared: u32) -> Result<usize> {
        self.ensure_packets_mode()?;
        let source = self
            .packets
            .get(index)
            .ok_or(CoreError::PacketNotFound(index))?;
        let requested = self.grand_total() + source.total_items;
        if requested > u64::from(declared) {
            return Err(CoreError::AllocationExceeded {
                declared,
                requested,
            });
        }
        let composition = source.composition.clone();
        let number = self.packets.len() as u32 + 1;
        self.packets.push(Packet::new(number, composition, false));
        Ok(self.packets.len() - 1)
    }

    /// Replace a packet's composition.
    ///
    /// Rejected without any change when the allocator would hold more than
    /// `declared` units afterwards.
    pub fn set_composition(
        &mut self,
        index: usize,
        composition: Vec<CompositionEntry>,
        declared: u32,
    ) -> Result<()> {
        let current = self
            .packets
            .get(index)
            .ok_or(CoreError::PacketNotFound(index))?;
        let incoming = sparse_total(&composition);
        let requested = self.grand_total() - current.total_items + incoming;
        if requested > u64::from(declared) {
            return Err(CoreError::AllocationExceeded {
                declared,
                requested,
            });
        }
        let packet = &mut self.packets[index];
        packet.composition = composition;
        packet.total_items = incoming;
        Ok(())
    }

    /// Convert to `target` mode without touching `self`.
    ///
    /// packets -> loose sums every (color, size) across packets into one
    /// pool; loose -> packets keeps the pool as packet #1.
    pub fn switched(&self, target: PacketMode) -> Self {
        match target {
            PacketMode::Loose => {
                let mut merged: Vec<CompositionEntry> = Vec::new();
                for entry in self.packets.iter().flat_map(|p| &p.composition) {
                    match merged
                        .iter_mut()
                        .find(|m| m.color == entry.color && m.size == entry.size)
                    {
                        Some(existing) => {
                            existing.quantity = existing.quantity.saturating_add(entry.quantity)
                        }
                        None => merged.push(entry.clone()),
                    }
                }
                Self {
                    mode: PacketMode::Loose,
                    packets: vec![Packet::new(1, merged, true)],
                }
            }
            PacketMode::Packets if self.mode == PacketMode::Packets => self.clone(),
            PacketMode::Packets => {
                let composition = self
                    .packets
                    .first()
                    .map(|p| p.composition.clone())
                    .unwrap_or_default();
                Self {
                    mode: PacketMode::Packets,
                    packets: vec![Packet::new(1, composition, false)],
                }
            }
        }
    }

    pub fn switch_mode(&mut self, target: PacketMode) {
        *self = self.switched(target);
    }

    /// Drop cells whose color or size is no longer offered
    pub fn retain_cells(&mut self, colors: &[String], sizes: &[String]) {
        for packet in &mut self.packets {
            packet
                .composition
                .retain(|e| colors.contains(&e.color) && sizes.contains(&e.size));
            packet.total_items = sparse_total(&packet.composition);
        }
    }

    /// Submission check: an allocator holding any units must hold exactly
    /// the declared quantity.
    pub fn validate_for_submission(&self, declared: u32) -> Result<()> {
        let allocated = self.grand_total();
        if self.has_allocation() && allocated != u64::from(declared) {
            return Err(CoreError::QuantityMismatch {
                declared,
                allocated,
            });
        }
        Ok(())
    }

    pub fn compositions(&self) -> Vec<Vec<CompositionEntry>> {
        self.packets.iter().map(|p| p.composition.clone()).collect()
    }

    fn ensure_packets_mode(&self) -> Result<()> {
        match self.mode {
            PacketMode::Packets => Ok(()),
            PacketMode::Loose => Err(CoreError::LoosePoolIsSingular),
        }
    }

    fn renumber(&mut self) {
        for (i, packet) in self.packets.iter_mut().enumerate() {
            packet.packet_number = i as u32 + 1;
        }
    }
}

impl Default for PacketAllocator {
    fn default() -> Self {
        Self::new()
    }
}
