//! Record and file identifiers.

use std::fmt;

use super::PageId;

/// Identifies a data or index file in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0)
    }
}

/// Identifies a record stored in a slotted heap page.
///
/// The `unique` stamp is copied from the slot when the object is created.
/// Once the slot is reused it carries a new stamp, so an old id no longer
/// matches and is rejected instead of resolving to someone else's record.
///
/// # Encoding (12 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// 0       4     page_no
/// 4       2     vol_no
/// 6       2     slot_no
/// 8       4     unique
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub vol_no: u16,
    pub page_no: u32,
    pub slot_no: u16,
    pub unique: u32,
}

impl ObjectId {
    /// Encoded size in bytes.
    pub const SIZE: usize = 12;

    pub fn new(page_id: PageId, slot_no: u16, unique: u32) -> Self {
        Self {
            vol_no: page_id.vol_no,
            page_no: page_id.page_no,
            slot_no,
            unique,
        }
    }

    /// The page holding this object.
    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.vol_no, self.page_no)
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.page_no.to_le_bytes());
        buf[4..6].copy_from_slice(&self.vol_no.to_le_bytes());
        buf[6..8].copy_from_slice(&self.slot_no.to_le_bytes());
        buf[8..12].copy_from_slice(&self.unique.to_le_bytes());
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        Self {
            page_no: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            vol_no: u16::from_le_bytes([buf[4], buf[5]]),
            slot_no: u16::from_le_bytes([buf[6], buf[7]]),
            unique: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Oid({}:{}#{}@{})",
            self.vol_no, self.page_no, self.slot_no, self.unique
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_encoding() {
        let oid = ObjectId::new(PageId::new(2, 0x0102_0304), 7, 0xAABB_CCDD);
        let mut buf = [0u8; ObjectId::SIZE];
        oid.write_to(&mut buf);

        assert_eq!(buf[0], 0x04);
        assert_eq!(buf[4], 2);
        assert_eq!(buf[6], 7);
        assert_eq!(ObjectId::from_bytes(&buf), oid);
    }

    #[test]
    fn test_object_id_page() {
        let oid = ObjectId::new(PageId::new(1, 9), 0, 1);
        assert_eq!(oid.page_id(), PageId::new(1, 9));
        assert_eq!(format!("{}", oid), "Oid(1:9#0@1)");
    }
}
