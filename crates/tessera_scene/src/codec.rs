//! Binary wire format for scene updates.
//!
//! ```text
//! update  := header record*
//! header  := magic:[u8;4] version:u16 scene:u64 flush_index:u64 count:u32
//! record  := tag:u8 len:u32 payload:[u8; len]
//! ```
//!
//! Integers are little endian. `tag` is the [`ActionKind`] of the record and
//! `payload` its `postcard` encoding, so a reader can skip or filter records
//! by kind without decoding them, and records can be appended to an already
//! written buffer one by one.

use tessera_core::SceneId;

use crate::action::{ActionKind, SceneAction};
use crate::error::CodecError;
use crate::mutation_log::{MutationLog, SceneUpdate};

pub const MAGIC: [u8; 4] = *b"TSML";
pub const VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 8 + 8 + 4;
const RECORD_HEADER_LEN: usize = 1 + 4;

/// Appends one framed record to `out`.
pub fn write_record(out: &mut Vec<u8>, action: &SceneAction) -> Result<(), CodecError> {
    let payload = postcard::to_allocvec(action)?;
    out.reserve(RECORD_HEADER_LEN + payload.len());
    out.push(action.kind().tag());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

/// Encodes a whole update, header included.
pub fn encode_update(update: &SceneUpdate) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(HEADER_LEN + update.log.len() * 16);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&update.scene.0.to_le_bytes());
    out.extend_from_slice(&update.flush_index.to_le_bytes());
    out.extend_from_slice(&(update.log.len() as u32).to_le_bytes());
    for action in &update.log {
        write_record(&mut out, action)?;
    }
    Ok(out)
}

/// Decodes an update produced by [`encode_update`].
pub fn decode_update(bytes: &[u8]) -> Result<SceneUpdate, CodecError> {
    let mut reader = Reader::new(bytes);

    let magic: [u8; 4] = reader.array()?;
    if magic != MAGIC {
        return Err(CodecError::BadMagic(magic));
    }
    let version = u16::from_le_bytes(reader.array()?);
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let scene = SceneId(u64::from_le_bytes(reader.array()?));
    let flush_index = u64::from_le_bytes(reader.array()?);
    let count = u32::from_le_bytes(reader.array()?) as usize;

    // Every record takes at least its frame header.
    let mut log = MutationLog::with_capacity(count.min(reader.remaining() / RECORD_HEADER_LEN));
    for _ in 0..count {
        log.record(reader.record()?);
    }

    let trailing = reader.remaining();
    if trailing != 0 {
        return Err(CodecError::TrailingBytes(trailing));
    }

    Ok(SceneUpdate {
        scene,
        flush_index,
        log,
    })
}

/// Decodes a headerless sequence of records written with [`write_record`].
pub fn decode_records(bytes: &[u8]) -> Result<MutationLog, CodecError> {
    let mut reader = Reader::new(bytes);
    let mut log = MutationLog::new();
    while reader.remaining() > 0 {
        log.record(reader.record()?);
    }
    Ok(log)
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn record(&mut self) -> Result<SceneAction, CodecError> {
        let offset = self.offset;
        let [tag] = self.array::<1>()?;
        let kind = ActionKind::from_tag(tag).ok_or(CodecError::UnknownTag { tag, offset })?;
        let len = u32::from_le_bytes(self.array()?) as usize;
        let action: SceneAction = postcard::from_bytes(self.take(len)?)?;
        if action.kind() != kind {
            return Err(CodecError::TagMismatch {
                tag: kind,
                decoded: action.kind(),
            });
        }
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::objects::{DataObjectHandle, DataValue, NodeHandle, TransformHandle};

    fn sample_update() -> SceneUpdate {
        SceneUpdate {
            scene: SceneId(42),
            flush_index: 7,
            log: MutationLog::from(vec![
                SceneAction::AllocateNode {
                    handle: NodeHandle::new(0, 0),
                },
                SceneAction::AllocateTransform {
                    handle: TransformHandle::new(0, 0),
                    node: NodeHandle::new(0, 0),
                },
                SceneAction::SetTransformRotation {
                    transform: TransformHandle::new(0, 0),
                    value: Quat::from_rotation_y(0.5),
                },
                SceneAction::SetTransformTranslation {
                    transform: TransformHandle::new(0, 0),
                    value: Vec3::new(1.0, -2.0, 0.25),
                },
                SceneAction::AllocateDataObject {
                    handle: DataObjectHandle::new(3, 2),
                    value: DataValue::Vec3(Vec3::X),
                },
            ]),
        }
    }

    #[test]
    fn update_survives_encoding() {
        let update = sample_update();
        let bytes = encode_update(&update).unwrap();
        assert_eq!(&bytes[..4], b"TSML");
        assert_eq!(decode_update(&bytes).unwrap(), update);
    }

    #[test]
    fn records_can_be_appended_incrementally() {
        let update = sample_update();
        let mut bytes = Vec::new();
        for action in &update.log {
            write_record(&mut bytes, action).unwrap();
        }
        assert_eq!(decode_records(&bytes).unwrap(), update.log);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = encode_update(&sample_update()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            decode_update(cut),
            Err(CodecError::Truncated { needed: 3, .. })
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut bytes = Vec::new();
        write_record(
            &mut bytes,
            &SceneAction::AllocateNode {
                handle: NodeHandle::new(1, 0),
            },
        )
        .unwrap();
        bytes[0] = 0xEE;
        assert!(matches!(
            decode_records(&bytes),
            Err(CodecError::UnknownTag { tag: 0xEE, offset: 0 })
        ));
    }

    #[test]
    fn mismatched_tag_is_rejected() {
        let mut bytes = Vec::new();
        write_record(
            &mut bytes,
            &SceneAction::ReleaseNode {
                handle: NodeHandle::new(1, 0),
            },
        )
        .unwrap();
        bytes[0] = ActionKind::AllocateNode.tag();
        assert!(matches!(
            decode_records(&bytes),
            Err(CodecError::TagMismatch { .. })
        ));
    }

    #[test]
    fn bad_header_is_rejected() {
        let mut bytes = encode_update(&sample_update()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            decode_update(&bytes),
            Err(CodecError::UnsupportedVersion(9))
        ));
        bytes[0] = b'X';
        assert!(matches!(decode_update(&bytes), Err(CodecError::BadMagic(_))));
    }
}
