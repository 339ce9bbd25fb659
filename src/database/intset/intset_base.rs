use std::{fmt, slice::ChunksExact};

use byteorder::{ByteOrder, LittleEndian};
use kvprim_error::IntSetError;
use num_enum::TryFromPrimitive;
use rand::Rng;
use tracing::{debug, warn};

/// Максимальное число элементов: длина хранится в 32-битном поле.
pub const INTSET_MAX_LEN: usize = u32::MAX as usize;

/// Ширина хранения одного элемента. Числовое значение равно размеру в байтах
/// и совпадает с тегом в бинарном представлении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive)]
#[repr(u32)]
pub enum Encoding {
    Int16 = 2,
    Int32 = 4,
    Int64 = 8,
}

impl Encoding {
    /// Размер элемента в байтах.
    #[inline(always)]
    pub const fn width(self) -> usize {
        self as usize
    }

    /// Самая узкая ширина, в которую помещается `value`.
    #[inline]
    pub fn for_value(value: i64) -> Encoding {
        if value < i32::MIN as i64 || value > i32::MAX as i64 {
            Encoding::Int64
        } else if value < i16::MIN as i64 || value > i16::MAX as i64 {
            Encoding::Int32
        } else {
            Encoding::Int16
        }
    }

    /// Читает элемент из среза длиной `width()` с расширением знака.
    #[inline]
    fn read(
        self,
        src: &[u8],
    ) -> i64 {
        match self {
            Encoding::Int16 => LittleEndian::read_i16(src) as i64,
            Encoding::Int32 => LittleEndian::read_i32(src) as i64,
            Encoding::Int64 => LittleEndian::read_i64(src),
        }
    }

    /// Пишет элемент, который заведомо помещается в эту ширину.
    #[inline]
    fn write(
        self,
        dst: &mut [u8],
        value: i64,
    ) {
        match self {
            Encoding::Int16 => LittleEndian::write_i16(dst, value as i16),
            Encoding::Int32 => LittleEndian::write_i32(dst, value as i32),
            Encoding::Int64 => LittleEndian::write_i64(dst, value),
        }
    }
}

/// Компактное отсортированное множество целых чисел.
///
/// Все элементы лежат в одном непрерывном буфере little-endian одинаковой
/// ширины, строго по возрастанию. Ширина выбирается по самому «широкому»
/// элементу и только расширяется: удаление элементов её не сужает.
#[derive(Clone)]
pub struct IntSet {
    encoding: Encoding,
    contents: Vec<u8>,
}

/// Итератор по элементам `IntSet` в порядке возрастания.
///
/// Не выделяет память и читает значения прямо из буфера.
#[derive(Clone)]
pub struct IntSetIter<'a> {
    chunks: ChunksExact<'a, u8>,
    encoding: Encoding,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl IntSet {
    /// Создаёт пустое множество с шириной 2 байта.
    pub fn new() -> Self {
        Self {
            encoding: Encoding::Int16,
            contents: Vec::new(),
        }
    }

    /// Собирает множество из уже проверенных частей.
    pub(super) fn from_parts(
        encoding: Encoding,
        contents: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(contents.len() % encoding.width(), 0);
        Self { encoding, contents }
    }

    /// Сырые байты элементов.
    #[inline]
    pub(super) fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Текущая ширина хранения.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contents.len() / self.encoding.width()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Размер бинарного представления: заголовок плюс `len * width`.
    #[inline]
    pub fn blob_len(&self) -> usize {
        super::INTSET_HEADER_SIZE + self.contents.len()
    }

    /// Элемент по позиции в порядке возрастания.
    pub fn get(
        &self,
        pos: usize,
    ) -> Option<i64> {
        (pos < self.len()).then(|| self.read_at(pos))
    }

    /// Проверяет принадлежность. Значения шире текущей кодировки отсекаются
    /// без поиска.
    pub fn find(
        &self,
        value: i64,
    ) -> bool {
        Encoding::for_value(value) <= self.encoding && self.search(value).is_ok()
    }

    #[inline]
    pub fn contains(
        &self,
        value: i64,
    ) -> bool {
        self.find(value)
    }

    /// Добавляет значение, сохраняя порядок.
    ///
    /// Если значение не помещается в текущую ширину, все элементы сначала
    /// расширяются. При ошибке множество остаётся прежним.
    pub fn add(
        &mut self,
        value: i64,
    ) -> Result<(), IntSetError> {
        let required = Encoding::for_value(value);
        if required > self.encoding {
            // Новое значение шире всех текущих, значит оно меньше всех или
            // больше всех, и дубликатом быть не может.
            return self.upgrade_and_add(value, required);
        }

        let pos = match self.search(value) {
            Ok(_) => return Err(IntSetError::AlreadyPresent { value }),
            Err(pos) => pos,
        };

        let len = self.len();
        self.resize(len + 1)?;
        if pos < len {
            self.move_tail(pos, pos + 1, len - pos);
        }
        self.write_at(pos, value);
        Ok(())
    }

    /// Удаляет значение. Ширина хранения не уменьшается.
    pub fn remove(
        &mut self,
        value: i64,
    ) -> Result<(), IntSetError> {
        if Encoding::for_value(value) > self.encoding {
            return Err(IntSetError::NotFound { value });
        }

        let pos = self
            .search(value)
            .map_err(|_| IntSetError::NotFound { value })?;

        let len = self.len();
        if pos + 1 < len {
            self.move_tail(pos + 1, pos, len - pos - 1);
        }
        self.shrink(len - 1);
        Ok(())
    }

    /// Случайный элемент или `None` для пустого множества.
    pub fn random(&self) -> Option<i64> {
        self.random_with(&mut rand::thread_rng())
    }

    /// То же, что [`random`](Self::random), но с внешним генератором.
    pub fn random_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<i64> {
        if self.is_empty() {
            return None;
        }
        Some(self.read_at(rng.gen_range(0..self.len())))
    }

    /// Итератор по всем элементам по возрастанию.
    pub fn iter(&self) -> IntSetIter<'_> {
        IntSetIter::new(&self.contents, self.encoding)
    }

    /// Итератор по элементам из диапазона `[start, end]` включительно.
    ///
    /// Для `start > end` итератор пуст.
    pub fn iter_range(
        &self,
        start: i64,
        end: i64,
    ) -> IntSetIter<'_> {
        if start > end {
            return IntSetIter::new(&[], self.encoding);
        }

        let from = match self.search(start) {
            Ok(pos) | Err(pos) => pos,
        };
        let to = match self.search(end) {
            Ok(pos) => pos + 1,
            Err(pos) => pos,
        };

        let width = self.encoding.width();
        IntSetIter::new(&self.contents[from * width..to * width], self.encoding)
    }

    /// Позиция значения (`Ok`) или позиция для вставки (`Err`).
    ///
    /// Сравнение идёт в `i64`, поэтому значение любой ширины сравнивается
    /// корректно.
    fn search(
        &self,
        value: i64,
    ) -> Result<usize, usize> {
        let len = self.len();
        if len == 0 {
            return Err(0);
        }

        // Частые случаи: вставка в конец или в начало.
        if value > self.read_at(len - 1) {
            return Err(len);
        }
        if value < self.read_at(0) {
            return Err(0);
        }

        let (mut lo, mut hi) = (0, len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let cur = self.read_at(mid);
            if cur < value {
                lo = mid + 1;
            } else if cur > value {
                hi = mid;
            } else {
                return Ok(mid);
            }
        }
        Err(lo)
    }

    /// Расширяет все элементы до `new_enc` и добавляет `value` в начало
    /// (если оно отрицательное) или в конец.
    fn upgrade_and_add(
        &mut self,
        value: i64,
        new_enc: Encoding,
    ) -> Result<(), IntSetError> {
        let old_enc = self.encoding;
        let (old_w, new_w) = (old_enc.width(), new_enc.width());
        let len = self.len();
        let new_len = len + 1;
        if new_len > INTSET_MAX_LEN {
            return Err(IntSetError::LengthOverflow {
                requested: new_len,
                max: INTSET_MAX_LEN,
            });
        }

        self.reserve_to(new_len * new_w)?;
        self.contents.resize(new_len * new_w, 0);

        // С конца к началу: запись в широком формате не затирает ещё не
        // прочитанные узкие элементы.
        let prepend = usize::from(value < 0);
        for i in (0..len).rev() {
            let v = old_enc.read(&self.contents[i * old_w..(i + 1) * old_w]);
            let at = (i + prepend) * new_w;
            new_enc.write(&mut self.contents[at..at + new_w], v);
        }

        self.encoding = new_enc;
        self.write_at(if prepend == 1 { 0 } else { len }, value);

        debug!(from = ?old_enc, to = ?new_enc, len = new_len, "intset encoding upgraded");
        Ok(())
    }

    #[inline]
    fn read_at(
        &self,
        pos: usize,
    ) -> i64 {
        let w = self.encoding.width();
        self.encoding.read(&self.contents[pos * w..(pos + 1) * w])
    }

    #[inline]
    fn write_at(
        &mut self,
        pos: usize,
        value: i64,
    ) {
        let w = self.encoding.width();
        self.encoding
            .write(&mut self.contents[pos * w..(pos + 1) * w], value);
    }

    /// Сдвигает `count` элементов с позиции `from` на позицию `to`.
    #[inline]
    fn move_tail(
        &mut self,
        from: usize,
        to: usize,
        count: usize,
    ) {
        let w = self.encoding.width();
        self.contents
            .copy_within(from * w..(from + count) * w, to * w);
    }

    /// Увеличивает буфер до `new_len` элементов текущей ширины.
    fn resize(
        &mut self,
        new_len: usize,
    ) -> Result<(), IntSetError> {
        if new_len > INTSET_MAX_LEN {
            return Err(IntSetError::LengthOverflow {
                requested: new_len,
                max: INTSET_MAX_LEN,
            });
        }

        let bytes = new_len * self.encoding.width();
        self.reserve_to(bytes)?;
        self.contents.resize(bytes, 0);
        Ok(())
    }

    fn shrink(
        &mut self,
        new_len: usize,
    ) {
        self.contents.truncate(new_len * self.encoding.width());
        self.contents.shrink_to_fit();
    }

    /// Резервирует место под `bytes` байт, не трогая содержимое при отказе.
    fn reserve_to(
        &mut self,
        bytes: usize,
    ) -> Result<(), IntSetError> {
        let additional = bytes.saturating_sub(self.contents.len());
        self.contents.try_reserve_exact(additional).map_err(|e| {
            warn!(requested = bytes, error = %e, "intset reallocation failed");
            IntSetError::OutOfMemory { requested: bytes }
        })
    }

    /// Проверяет внутренние инварианты структуры.
    #[cfg(debug_assertions)]
    pub fn debug_assert_invariants(&self) {
        let w = self.encoding.width();
        assert_eq!(
            self.contents.len() % w,
            0,
            "IntSet invariant violation: {} bytes is not a multiple of width {w}",
            self.contents.len()
        );
        let mut prev = None;
        for v in self.iter() {
            assert!(
                Encoding::for_value(v) <= self.encoding,
                "IntSet invariant violation: {v} does not fit {:?}",
                self.encoding
            );
            if let Some(p) = prev {
                assert!(
                    p < v,
                    "IntSet invariant violation: {p} must be < {v} (strictly ascending)"
                );
            }
            prev = Some(v);
        }
    }

    /// No-op в release-сборке.
    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn debug_assert_invariants(&self) {}
}

impl<'a> IntSetIter<'a> {
    fn new(
        bytes: &'a [u8],
        encoding: Encoding,
    ) -> Self {
        Self {
            chunks: bytes.chunks_exact(encoding.width()),
            encoding,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для IntSet
////////////////////////////////////////////////////////////////////////////////

impl Default for IntSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IntSet {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("IntSet")
            .field("encoding", &self.encoding)
            .field("members", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

/// Множества равны, если совпадают их элементы. Ширина хранения не
/// учитывается: она зависит от истории удалений.
impl PartialEq for IntSet {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for IntSet {}

impl<'a> IntoIterator for &'a IntSet {
    type Item = i64;
    type IntoIter = IntSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Iterator for IntSetIter<'_> {
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next().map(|c| self.encoding.read(c))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for IntSetIter<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.chunks.len()
    }
}

impl DoubleEndedIterator for IntSetIter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.chunks.next_back().map(|c| self.encoding.read(c))
    }
}

impl std::iter::FusedIterator for IntSetIter<'_> {}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::database::intset::INTSET_HEADER_SIZE;

    fn set_of(values: &[i64]) -> IntSet {
        let mut s = IntSet::new();
        for &v in values {
            s.add(v).unwrap();
        }
        s
    }

    #[test]
    fn test_encoding_for_value() {
        assert_eq!(Encoding::for_value(0), Encoding::Int16);
        assert_eq!(Encoding::for_value(i16::MIN as i64), Encoding::Int16);
        assert_eq!(Encoding::for_value(i16::MAX as i64 + 1), Encoding::Int32);
        assert_eq!(Encoding::for_value(i32::MIN as i64), Encoding::Int32);
        assert_eq!(Encoding::for_value(i32::MIN as i64 - 1), Encoding::Int64);
        assert_eq!(Encoding::for_value(i64::MAX), Encoding::Int64);
    }

    #[test]
    fn test_encoding_tags() {
        assert_eq!(Encoding::try_from(2u32), Ok(Encoding::Int16));
        assert_eq!(Encoding::try_from(8u32), Ok(Encoding::Int64));
        assert!(Encoding::try_from(3u32).is_err());
        assert!(Encoding::Int16 < Encoding::Int32);
    }

    /// Тест проверяет пример: {5, 6, 4} хранится как [4, 5, 6] в 2 байтах.
    #[test]
    fn test_add_keeps_sorted() {
        let s = set_of(&[5, 6, 4]);

        assert_eq!(s.encoding(), Encoding::Int16);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(s.blob_len(), INTSET_HEADER_SIZE + 6);
        s.debug_assert_invariants();
    }

    #[test]
    fn test_add_duplicate() {
        let mut s = set_of(&[5, 6, 4]);

        assert_eq!(s.add(5), Err(IntSetError::AlreadyPresent { value: 5 }));
        assert_eq!(s.len(), 3);
    }

    /// Тест проверяет расширение до 4 байт при добавлении 65535 в конец.
    #[test]
    fn test_upgrade_append() {
        let mut s = set_of(&[4, 5, 6]);
        s.add(65535).unwrap();

        assert_eq!(s.encoding(), Encoding::Int32);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![4, 5, 6, 65535]);
        s.debug_assert_invariants();
    }

    /// Тест проверяет расширение с добавлением отрицательного значения в
    /// начало.
    #[test]
    fn test_upgrade_prepend() {
        let mut s = set_of(&[4, 5, 6]);
        s.add(-65535).unwrap();

        assert_eq!(s.encoding(), Encoding::Int32);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![-65535, 4, 5, 6]);
        s.debug_assert_invariants();
    }

    #[test]
    fn test_upgrade_chain_to_int64() {
        let mut s = set_of(&[-1, 1]);
        s.add(1 << 20).unwrap();
        s.add(i64::MIN).unwrap();

        assert_eq!(s.encoding(), Encoding::Int64);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![i64::MIN, -1, 1, 1 << 20]);
        assert!(s.find(-1));
        s.debug_assert_invariants();
    }

    #[test]
    fn test_upgrade_from_empty() {
        let mut s = IntSet::new();
        s.add(i64::MAX).unwrap();

        assert_eq!(s.encoding(), Encoding::Int64);
        assert_eq!(s.get(0), Some(i64::MAX));
    }

    #[test]
    fn test_find_wider_value_short_circuit() {
        let s = set_of(&[1, 2, 3]);

        assert!(s.find(2));
        assert!(!s.find(70000));
        assert!(!s.find(i64::MIN));
        assert!(s.contains(3));
    }

    /// Тест проверяет, что удаление не сужает кодировку.
    #[test]
    fn test_remove_keeps_encoding() {
        let mut s = set_of(&[1, 100_000]);
        s.remove(100_000).unwrap();

        assert_eq!(s.encoding(), Encoding::Int32);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1]);
        s.debug_assert_invariants();
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let mut s = set_of(&[1, 2, 3, 4, 5]);
        s.remove(3).unwrap();
        s.remove(1).unwrap();
        s.remove(5).unwrap();

        assert_eq!(s.iter().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(s.blob_len(), INTSET_HEADER_SIZE + 4);
    }

    #[test]
    fn test_remove_missing() {
        let mut s = set_of(&[1, 2]);

        assert_eq!(s.remove(7), Err(IntSetError::NotFound { value: 7 }));
        assert_eq!(
            s.remove(i64::MAX),
            Err(IntSetError::NotFound { value: i64::MAX })
        );
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_remove_last_element() {
        let mut s = set_of(&[42]);
        s.remove(42).unwrap();

        assert!(s.is_empty());
        assert_eq!(s.random(), None);
    }

    #[test]
    fn test_get() {
        let s = set_of(&[30, -10, 20]);

        assert_eq!(s.get(0), Some(-10));
        assert_eq!(s.get(2), Some(30));
        assert_eq!(s.get(3), None);
    }

    #[test]
    fn test_random_member() {
        let s = set_of(&[3, 1, 2]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let v = s.random_with(&mut rng).unwrap();
            assert!(s.find(v));
        }
        assert!(s.find(s.random().unwrap()));
    }

    #[test]
    fn test_random_empty() {
        let s = IntSet::new();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(s.random_with(&mut rng), None);
    }

    #[test]
    fn test_iter_double_ended() {
        let s = set_of(&[1, 2, 3, 4]);
        let mut it = s.iter();

        assert_eq!(it.len(), 4);
        assert_eq!(it.next(), Some(1));
        assert_eq!(it.next_back(), Some(4));
        assert_eq!(it.len(), 2);
        assert_eq!(it.rev().collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_iter_range() {
        let s = set_of(&[-5, 0, 5, 10, 15]);

        assert_eq!(s.iter_range(0, 10).collect::<Vec<_>>(), vec![0, 5, 10]);
        assert_eq!(s.iter_range(1, 9).collect::<Vec<_>>(), vec![5]);
        assert_eq!(s.iter_range(i64::MIN, -5).collect::<Vec<_>>(), vec![-5]);
        assert_eq!(s.iter_range(16, i64::MAX).count(), 0);
        assert_eq!(s.iter_range(10, 0).count(), 0);
        assert_eq!(s.iter_range(i64::MIN, i64::MAX).len(), 5);
    }

    #[test]
    fn test_iter_range_empty_set() {
        let s = IntSet::new();
        assert_eq!(s.iter_range(0, 10).count(), 0);
    }

    #[test]
    fn test_equality_ignores_encoding() {
        let mut wide = set_of(&[1, 2, 100_000]);
        wide.remove(100_000).unwrap();
        let narrow = set_of(&[2, 1]);

        assert_ne!(wide.encoding(), narrow.encoding());
        assert_eq!(wide, narrow);
    }

    #[test]
    fn test_extreme_values() {
        let s = set_of(&[
            i64::MAX,
            i64::MIN,
            i32::MAX as i64,
            i32::MIN as i64,
            i16::MAX as i64,
            i16::MIN as i64,
            0,
        ]);

        let v: Vec<_> = s.iter().collect();
        let mut expected = v.clone();
        expected.sort_unstable();
        assert_eq!(v, expected);
        assert_eq!(v.len(), 7);
        s.debug_assert_invariants();
    }
}
