use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use kvprim_error::{context, ensure, KvprimResult, ResultExt, SdsError};
use tracing::warn;

use super::{sds_base::check_len, Sds};

impl Sds {
    /// Пишет строку в бинарном виде:
    /// `[len: u32 LE][free: u32 LE][содержимое][0][свободное место]`.
    pub fn write_to<W: Write>(
        &self,
        w: &mut W,
    ) -> KvprimResult<()> {
        let (len, free) = (self.len(), self.avail());
        check_len(len.max(free))?;

        w.write_u32::<LittleEndian>(len as u32)
            .context("write sds header")?;
        w.write_u32::<LittleEndian>(free as u32)
            .context("write sds header")?;
        w.write_all(self.raw_buf()).context("write sds payload")?;
        Ok(())
    }

    /// Бинарное представление в новом буфере, размером ровно
    /// [`alloc_size`](Sds::alloc_size).
    pub fn to_blob(&self) -> KvprimResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.alloc_size());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Читает строку, записанную [`write_to`](Sds::write_to).
    ///
    /// Проверяется, что тело полностью прочитано и на позиции `len` стоит
    /// терминатор.
    pub fn read_from<R: Read>(r: &mut R) -> KvprimResult<Sds> {
        let len = r.read_u32::<LittleEndian>().context("read sds header")? as usize;
        let free = r.read_u32::<LittleEndian>().context("read sds header")? as usize;
        let total = len + free + 1;

        // Заголовок не доверенный: буфер растёт по мере чтения.
        let mut buf = Vec::new();
        context!(
            r.by_ref().take(total as u64).read_to_end(&mut buf),
            "read sds payload of {} bytes",
            total
        )?;

        ensure!(
            buf.len() == total,
            invalid(format!(
                "payload truncated: expected {total} bytes, got {}",
                buf.len()
            ))
        );
        ensure!(
            buf[len] == 0,
            invalid(format!("missing terminator at offset {len}"))
        );

        Ok(Sds::from_parts(len, buf))
    }

    /// Разбирает строку из среза. Лишние байты после тела считаются ошибкой.
    pub fn from_blob(bytes: &[u8]) -> KvprimResult<Sds> {
        let mut cursor = bytes;
        let sds = Sds::read_from(&mut cursor)?;
        ensure!(
            cursor.is_empty(),
            invalid(format!("{} trailing bytes", cursor.len()))
        );
        Ok(sds)
    }
}

fn invalid(reason: String) -> SdsError {
    warn!(%reason, "rejected sds blob");
    SdsError::InvalidBlob { reason }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
