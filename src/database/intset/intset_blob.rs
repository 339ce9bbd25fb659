use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use kvprim_error::{bail, context, ensure, IntSetError, KvprimResult, ResultExt};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use super::{Encoding, IntSet, INTSET_MAX_LEN};

/// Размер заголовка `[encoding: u32][length: u32]`.
pub const INTSET_HEADER_SIZE: usize = 8;

impl IntSet {
    /// Пишет множество как `[encoding u32 LE][length u32 LE][элементы LE]`.
    pub fn write_to<W: Write>(
        &self,
        w: &mut W,
    ) -> KvprimResult<()> {
        let len = self.len();
        if len > INTSET_MAX_LEN {
            return Err(IntSetError::LengthOverflow {
                requested: len,
                max: INTSET_MAX_LEN,
            }
            .into());
        }

        w.write_u32::<LittleEndian>(self.encoding() as u32)
            .context("write intset header")?;
        w.write_u32::<LittleEndian>(len as u32)
            .context("write intset header")?;
        w.write_all(self.contents())
            .context("write intset contents")?;
        Ok(())
    }

    /// Бинарное представление размером ровно [`blob_len`](IntSet::blob_len).
    pub fn to_blob(&self) -> KvprimResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.blob_len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Читает множество и проверяет его: тег ширины из {2, 4, 8}, полное
    /// тело и строгое возрастание элементов.
    pub fn read_from<R: Read>(r: &mut R) -> KvprimResult<IntSet> {
        let tag = r
            .read_u32::<LittleEndian>()
            .context("read intset header")?;
        let Ok(encoding) = Encoding::try_from(tag) else {
            bail!(invalid(format!("unknown encoding tag {tag}")));
        };
        let len = r
            .read_u32::<LittleEndian>()
            .context("read intset header")? as usize;

        let total = len * encoding.width();
        let mut contents = Vec::new();
        context!(
            r.by_ref().take(total as u64).read_to_end(&mut contents),
            "read intset contents of {} bytes",
            total
        )?;

        ensure!(
            contents.len() == total,
            invalid(format!(
                "contents truncated: expected {total} bytes, got {}",
                contents.len()
            ))
        );

        let set = IntSet::from_parts(encoding, contents);
        let mut prev: Option<i64> = None;
        for (pos, v) in set.iter().enumerate() {
            ensure!(
                !prev.is_some_and(|p| p >= v),
                invalid(format!(
                    "element {v} at position {pos} breaks ascending order"
                ))
            );
            prev = Some(v);
        }

        Ok(set)
    }

    /// Разбирает множество из среза. Лишние байты после тела считаются
    /// ошибкой.
    pub fn from_blob(bytes: &[u8]) -> KvprimResult<IntSet> {
        let mut cursor = bytes;
        let set = IntSet::read_from(&mut cursor)?;
        ensure!(
            cursor.is_empty(),
            invalid(format!("{} trailing bytes", cursor.len()))
        );
        Ok(set)
    }
}

fn invalid(reason: String) -> IntSetError {
    warn!(%reason, "rejected intset blob");
    IntSetError::InvalidBlob { reason }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для IntSet
////////////////////////////////////////////////////////////////////////////////

impl Serialize for IntSet {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let blob = self.to_blob().map_err(ser::Error::custom)?;
        serializer.serialize_bytes(&blob)
    }
}

impl<'de> Deserialize<'de> for IntSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let blob = <Vec<u8>>::deserialize(deserializer)?;
        IntSet::from_blob(&blob).map_err(de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
