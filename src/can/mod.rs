//! EV-CAN boundary: raw frames, the signal decode tables, the frame
//! decoder and the outbound command dispatcher.
//!
//! Only 11-bit standard identifiers are modelled; the Leaf EV bus does not
//! use extended ones.

pub mod bits;
pub mod command;
pub mod decoder;
pub mod signals;

use embedded_can::{Frame, Id, StandardId};

/// Largest classic-CAN payload.
pub const MAX_DLC: usize = 8;

/// One classic CAN data frame with a standard identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    id: StandardId,
    data: heapless::Vec<u8, MAX_DLC>,
}

impl RawFrame {
    /// Build a frame from a raw 11-bit identifier.
    ///
    /// Returns `None` if the identifier exceeds `0x7FF` or the payload is
    /// longer than eight bytes.
    pub fn standard(id: u16, data: &[u8]) -> Option<Self> {
        let id = StandardId::new(id)?;
        let data = heapless::Vec::from_slice(data).ok()?;
        Some(Self { id, data })
    }

    /// The 11-bit identifier as a plain integer.
    pub fn identifier(&self) -> u16 {
        self.id.as_raw()
    }

    pub fn payload(&self) -> &[u8] {
        &self.data
    }
}

impl Frame for RawFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => Self::standard(id.as_raw(), data),
            Id::Extended(_) => None,
        }
    }

    /// Remote frames never appear on the EV bus.
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.data.len()
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_identifier() {
        assert!(RawFrame::standard(0x800, &[]).is_none());
        assert!(RawFrame::standard(0x7FF, &[]).is_some());
    }

    #[test]
    fn rejects_oversized_payload() {
        assert!(RawFrame::standard(0x1DB, &[0; 9]).is_none());
    }

    #[test]
    fn frame_trait_view_matches_inherent_accessors() {
        let f = RawFrame::standard(0x5BC, &[0x12, 0x34]).unwrap();
        assert_eq!(f.dlc(), 2);
        assert_eq!(f.data(), f.payload());
        assert_eq!(f.id(), Id::Standard(StandardId::new(0x5BC).unwrap()));
        assert!(f.is_data_frame());
    }

    #[test]
    fn extended_identifiers_are_refused() {
        let ext = embedded_can::ExtendedId::new(0x1234).unwrap();
        assert!(<RawFrame as Frame>::new(ext, &[1]).is_none());
    }
}
