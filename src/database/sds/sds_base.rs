use std::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    ops::{Deref, DerefMut},
    str::{from_utf8, Utf8Error},
};

use kvprim_error::SdsError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace, warn};

/// Порог, после которого рост буфера переключается с удвоения на линейный.
pub const SDS_MAX_PREALLOC: usize = 1024 * 1024;
/// Размер заголовка `[len: u32][free: u32]` в бинарном представлении.
pub const SDS_HEADER_SIZE: usize = 8;
/// Максимальная длина и максимальный `free`: оба поля заголовка 32-битные.
pub const SDS_MAX_LEN: usize = u32::MAX as usize;

/// Динамическая бинарно-безопасная строка.
///
/// Буфер всегда имеет размер `len + free + 1`, байт `buf[len]` всегда равен
/// нулю и в длину не входит. Всё, что лежит после терминатора, считается
/// свободным местом и переиспользуется при следующих дописываниях.
#[derive(Clone)]
pub struct Sds {
    len: usize,
    buf: Vec<u8>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Sds {
    /// Создаёт строку из среза байт. Свободного места нет (`free == 0`).
    ///
    /// Как и `From<Vec<u8>>`, не проверяет [`SDS_MAX_LEN`].
    #[inline]
    pub fn new_len(init: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(init.len() + 1);
        buf.extend_from_slice(init);
        buf.push(0);

        Self {
            len: init.len(),
            buf,
        }
    }

    /// Создаёт строку из `&str`.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self::new_len(s.as_bytes())
    }

    /// Создаёт пустую строку.
    #[inline]
    pub fn empty() -> Self {
        Self {
            len: 0,
            buf: vec![0],
        }
    }

    /// Десятичное представление числа.
    pub fn from_i64(value: i64) -> Self {
        Sds::from(value.to_string())
    }

    /// Собирает строку из частей уже проверенного буфера.
    pub(super) fn from_parts(
        len: usize,
        buf: Vec<u8>,
    ) -> Self {
        debug_assert!(len < buf.len() && buf[len] == 0);
        Self { len, buf }
    }

    /// Буфер целиком: содержимое, терминатор и свободное место.
    #[inline]
    pub(super) fn raw_buf(&self) -> &[u8] {
        &self.buf
    }

    /// Глубокая копия с собственным буфером.
    ///
    /// Свободное место копии не наследуется.
    #[inline]
    pub fn dup(&self) -> Self {
        Self::new_len(self.as_bytes())
    }

    /// Возвращает текущую длину строки в байтах. O(1).
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Количество выделенных, но не занятых байт. O(1).
    #[inline(always)]
    pub fn avail(&self) -> usize {
        self.buf.len() - self.len - 1
    }

    /// Полный объём строки: заголовок, содержимое, свободное место и
    /// терминатор.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        SDS_HEADER_SIZE + self.buf.len()
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Содержимое вместе с завершающим нулём, для C-совместимых API.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    #[inline(always)]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }

    /// Преобразует содержимое в `&str`, если оно валидно как UTF-8.
    #[inline]
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(self.as_bytes())
    }

    /// Гарантирует, что после вызова `avail() >= addlen`.
    ///
    /// Если места не хватает, новый размер считается от `len + addlen`: ниже
    /// [`SDS_MAX_PREALLOC`] он удваивается, выше добавляется ровно
    /// `SDS_MAX_PREALLOC`. Длина строки не меняется.
    pub fn make_room_for(
        &mut self,
        addlen: usize,
    ) -> Result<(), SdsError> {
        let free = self.avail();
        if free >= addlen {
            return Ok(());
        }

        let newlen = self
            .len
            .checked_add(addlen)
            .filter(|&n| n <= SDS_MAX_LEN)
            .ok_or(SdsError::LengthOverflow {
                requested: self.len.saturating_add(addlen),
                max: SDS_MAX_LEN,
            })?;

        let target = if newlen < SDS_MAX_PREALLOC {
            newlen * 2
        } else {
            newlen + SDS_MAX_PREALLOC
        };
        // `free` тоже хранится в u32.
        let target = target.min(self.len + SDS_MAX_LEN);
        let additional = target + 1 - self.buf.len();

        if let Err(e) = self.buf.try_reserve_exact(additional) {
            warn!(len = self.len, requested = target + 1, error = %e, "sds reallocation failed");
            return Err(SdsError::OutOfMemory {
                requested: target + 1,
            });
        }

        if newlen >= SDS_MAX_PREALLOC {
            debug!(len = self.len, newlen, capacity = target, "sds linear preallocation");
        } else {
            trace!(len = self.len, newlen, capacity = target, "sds grow");
        }

        self.buf.resize(target + 1, 0);
        Ok(())
    }

    /// Дописывает байты в конец строки.
    pub fn cat_len(
        &mut self,
        t: &[u8],
    ) -> Result<(), SdsError> {
        self.make_room_for(t.len())?;

        let start = self.len;
        self.buf[start..start + t.len()].copy_from_slice(t);
        self.set_len(start + t.len());
        Ok(())
    }

    #[inline]
    pub fn cat(
        &mut self,
        t: &str,
    ) -> Result<(), SdsError> {
        self.cat_len(t.as_bytes())
    }

    #[inline]
    pub fn cat_sds(
        &mut self,
        t: &Sds,
    ) -> Result<(), SdsError> {
        self.cat_len(t.as_bytes())
    }

    /// Дописывает отформатированную строку.
    ///
    /// ```
    /// use kvprim::Sds;
    ///
    /// let mut s = Sds::new("id=");
    /// s.cat_fmt(format_args!("{}:{}", 7, "x")).unwrap();
    /// assert_eq!(s.as_bytes(), b"id=7:x");
    /// ```
    pub fn cat_fmt(
        &mut self,
        args: fmt::Arguments<'_>,
    ) -> Result<(), SdsError> {
        match args.as_str() {
            Some(s) => self.cat_len(s.as_bytes()),
            None => self.cat_len(fmt::format(args).as_bytes()),
        }
    }

    /// Дописывает экранированное представление `p` в двойных кавычках.
    ///
    /// Печатаемые ASCII-байты пишутся как есть, `\\ \" \n \r \t \a \b`
    /// экранируются, остальное выводится как `\xHH`.
    pub fn cat_repr(
        &mut self,
        p: &[u8],
    ) -> Result<(), SdsError> {
        let mut out = Vec::with_capacity(p.len() + 2);
        out.push(b'"');
        for &b in p {
            match b {
                b'\\' => out.extend_from_slice(b"\\\\"),
                b'"' => out.extend_from_slice(b"\\\""),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                0x07 => out.extend_from_slice(b"\\a"),
                0x08 => out.extend_from_slice(b"\\b"),
                0x20..=0x7e => out.push(b),
                _ => {
                    const HEX: &[u8; 16] = b"0123456789abcdef";
                    out.extend_from_slice(&[
                        b'\\',
                        b'x',
                        HEX[(b >> 4) as usize],
                        HEX[(b & 0x0f) as usize],
                    ]);
                }
            }
        }
        out.push(b'"');

        self.cat_len(&out)
    }

    /// Заменяет содержимое строки на `t`, переиспользуя буфер, если его
    /// хватает.
    pub fn cpy_len(
        &mut self,
        t: &[u8],
    ) -> Result<(), SdsError> {
        let total = self.buf.len() - 1;
        if total < t.len() {
            self.make_room_for(t.len() - self.len)?;
        }

        self.buf[..t.len()].copy_from_slice(t);
        self.set_len(t.len());
        Ok(())
    }

    #[inline]
    pub fn cpy(
        &mut self,
        t: &str,
    ) -> Result<(), SdsError> {
        self.cpy_len(t.as_bytes())
    }

    /// Дополняет строку нулями до длины `target`. Если строка уже не короче,
    /// ничего не делает.
    pub fn grow_zero(
        &mut self,
        target: usize,
    ) -> Result<(), SdsError> {
        if target <= self.len {
            return Ok(());
        }

        self.make_room_for(target - self.len)?;
        // Свободная область может содержать остатки после trim/clear.
        self.buf[self.len..=target].fill(0);
        self.len = target;
        Ok(())
    }

    /// Удаляет с обоих концов байты, входящие в `cset`.
    ///
    /// Память не освобождается: укороченная часть уходит во `free`.
    pub fn trim(
        &mut self,
        cset: &[u8],
    ) {
        let bytes = &self.buf[..self.len];
        let start = bytes
            .iter()
            .position(|b| !cset.contains(b))
            .unwrap_or(self.len);
        let end = bytes
            .iter()
            .rposition(|b| !cset.contains(b))
            .map_or(start, |p| p + 1);

        let newlen = end - start;
        if start > 0 && newlen > 0 {
            self.buf.copy_within(start..end, 0);
        }
        self.set_len(newlen);
    }

    /// Оставляет только диапазон `[start, end]` включительно.
    ///
    /// Отрицательные индексы отсчитываются от конца (`-1` последний байт).
    /// Индексы за пределами строки прижимаются к границам, пустой или
    /// перевёрнутый диапазон даёт пустую строку.
    pub fn range(
        &mut self,
        start: i64,
        end: i64,
    ) {
        let len = self.len as i64;
        if len == 0 {
            return;
        }

        let start = if start < 0 { (len + start).max(0) } else { start };
        let end = if end < 0 { (len + end).max(0) } else { end };

        // `end` прижимается к последнему байту до вычисления длины:
        // `end` может быть `i64::MAX`.
        let (start, newlen) = if start > end || start >= len {
            (0, 0)
        } else {
            (start, end.min(len - 1) - start + 1)
        };

        let (start, newlen) = (start as usize, newlen as usize);
        if start > 0 && newlen > 0 {
            self.buf.copy_within(start..start + newlen, 0);
        }
        self.set_len(newlen);
    }

    /// Делает строку пустой, сохраняя выделенную память.
    #[inline]
    pub fn clear(&mut self) {
        self.set_len(0);
    }

    /// Лексикографическое сравнение по реальной длине, без опоры на
    /// терминатор. Строка-префикс меньше более длинной.
    #[inline]
    pub fn compare(
        &self,
        other: &Sds,
    ) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }

    /// Переводит ASCII-буквы в нижний регистр.
    #[inline]
    pub fn to_lower(&mut self) {
        self.as_mut_bytes().make_ascii_lowercase();
    }

    /// Переводит ASCII-буквы в верхний регистр.
    #[inline]
    pub fn to_upper(&mut self) {
        self.as_mut_bytes().make_ascii_uppercase();
    }

    /// Заменяет каждый байт `from[i]` на `to[i]`. Учитывается первое
    /// совпадение, пары сверх длины более короткого набора игнорируются.
    pub fn map_chars(
        &mut self,
        from: &[u8],
        to: &[u8],
    ) {
        let pairs = from.len().min(to.len());
        for b in self.as_mut_bytes() {
            if let Some(i) = from[..pairs].iter().position(|f| f == b) {
                *b = to[i];
            }
        }
    }

    /// Свободная область за текущим содержимым.
    ///
    /// Вместе с [`make_room_for`](Self::make_room_for) и
    /// [`incr_len`](Self::incr_len) позволяет заполнять строку без
    /// промежуточных копий:
    ///
    /// ```
    /// use kvprim::Sds;
    ///
    /// let mut s = Sds::new("ab");
    /// s.make_room_for(2).unwrap();
    /// s.free_space_mut()[..2].copy_from_slice(b"cd");
    /// s.incr_len(2).unwrap();
    /// assert_eq!(s.as_bytes(), b"abcd");
    /// ```
    #[inline]
    pub fn free_space_mut(&mut self) -> &mut [u8] {
        let end = self.buf.len() - 1;
        &mut self.buf[self.len..end]
    }

    /// Сдвигает логическую длину на `incr` после записи в свободную область
    /// (или отрезает хвост при отрицательном `incr`).
    pub fn incr_len(
        &mut self,
        incr: isize,
    ) -> Result<(), SdsError> {
        let free = self.avail();
        let magnitude = incr.unsigned_abs();
        let fits = if incr >= 0 {
            magnitude <= free
        } else {
            magnitude <= self.len
        };

        if !fits {
            return Err(SdsError::LengthOutOfRange {
                incr,
                len: self.len,
                free,
            });
        }

        let newlen = if incr >= 0 {
            self.len + magnitude
        } else {
            self.len - magnitude
        };
        self.set_len(newlen);
        Ok(())
    }

    /// Пересчитывает длину как позицию первого нулевого байта.
    ///
    /// Нужна после внешней записи, которая сама поставила терминатор раньше
    /// текущего конца строки или внутри свободной области.
    pub fn update_len(&mut self) {
        let last = self.buf.len() - 1;
        let reallen = memchr::memchr(0, &self.buf[..last]).unwrap_or(last);
        self.set_len(reallen);
    }

    /// Освобождает всё свободное место. После вызова `avail() == 0`.
    pub fn remove_free_space(&mut self) {
        self.buf.truncate(self.len + 1);
        self.buf.shrink_to_fit();
    }

    #[inline(always)]
    fn set_len(
        &mut self,
        newlen: usize,
    ) {
        self.len = newlen;
        self.buf[newlen] = 0;
    }

    /// Проверяет внутренние инварианты структуры.
    #[cfg(debug_assertions)]
    pub fn debug_assert_invariants(&self) {
        assert!(
            self.len < self.buf.len(),
            "Sds invariant violation: len ({}) must be < buffer size ({})",
            self.len,
            self.buf.len()
        );
        assert_eq!(
            self.buf[self.len], 0,
            "Sds invariant violation: missing terminator at offset {}",
            self.len
        );
        assert!(
            self.len <= SDS_MAX_LEN && self.avail() <= SDS_MAX_LEN,
            "Sds invariant violation: header fields must fit u32 (len {}, free {})",
            self.len,
            self.avail()
        );
    }

    /// No-op в release-сборке.
    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn debug_assert_invariants(&self) {}
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для Sds
////////////////////////////////////////////////////////////////////////////////

impl Default for Sds {
    fn default() -> Self {
        Sds::empty()
    }
}

impl Deref for Sds {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl DerefMut for Sds {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_bytes()
    }
}

impl AsRef<[u8]> for Sds {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Write for Sds {
    fn write_str(
        &mut self,
        s: &str,
    ) -> fmt::Result {
        self.cat_len(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl Display for Sds {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{}", String::from_utf8_lossy(self.as_bytes())),
        }
    }
}

impl fmt::Debug for Sds {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Sds")
            .field("len", &self.len)
            .field("free", &self.avail())
            .field("data", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

impl Hash for Sds {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.as_bytes().hash(state);
    }
}

impl PartialEq for Sds {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Sds {}

impl PartialOrd for Sds {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sds {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.compare(other)
    }
}

impl TryFrom<Sds> for String {
    type Error = Utf8Error;

    fn try_from(value: Sds) -> Result<Self, Self::Error> {
        value.as_str().map(|s| s.to_string())
    }
}

impl From<&[u8]> for Sds {
    fn from(slice: &[u8]) -> Self {
        Sds::new_len(slice)
    }
}

impl From<&str> for Sds {
    fn from(s: &str) -> Self {
        Sds::new(s)
    }
}

/// Забирает вектор без копирования.
///
/// Длина не сверяется с [`SDS_MAX_LEN`]: конструкторы не падают, а строку
/// длиннее лимита отвергнет [`write_to`](Sds::write_to). Рост через
/// `make_room_for` лимит соблюдает.
impl From<Vec<u8>> for Sds {
    fn from(mut v: Vec<u8>) -> Self {
        let len = v.len();
        v.push(0);
        Sds { len, buf: v }
    }
}

impl From<String> for Sds {
    #[inline]
    fn from(s: String) -> Self {
        Sds::from(s.into_bytes())
    }
}

impl From<Sds> for Vec<u8> {
    fn from(s: Sds) -> Self {
        let mut buf = s.buf;
        buf.truncate(s.len);
        buf
    }
}

impl std::str::FromStr for Sds {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Sds::new(s))
    }
}

impl Serialize for Sds {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.as_bytes())
    }
}

impl<'de> Deserialize<'de> for Sds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        check_len(bytes.len()).map_err(de::Error::custom)?;
        Ok(Sds::from(bytes))
    }
}

/// Длина (или свободное место) должна помещаться в `u32` заголовка.
pub(super) fn check_len(len: usize) -> Result<(), SdsError> {
    if len > SDS_MAX_LEN {
        return Err(SdsError::LengthOverflow {
            requested: len,
            max: SDS_MAX_LEN,
        });
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
