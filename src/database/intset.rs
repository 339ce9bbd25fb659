//! Модуль компактного множества целых чисел (`IntSet`).
//!
//! Элементы хранятся отсортированными в одном буфере с одинаковой шириной
//! 2, 4 или 8 байт. Ширина подбирается по самому широкому значению и при
//! необходимости расширяется для всего множества сразу. Поиск идёт бинарно,
//! вставка и удаление сдвигают хвост буфера.
//!
//! Бинарное представление `[encoding][length][contents]` совпадает с
//! внутренним буфером, поэтому множество можно сохранить и загрузить без
//! промежуточных преобразований (см. [`IntSet::to_blob`]).

mod intset_base;
mod intset_blob;

pub use intset_base::{Encoding, IntSet, IntSetIter, INTSET_MAX_LEN};
pub use intset_blob::INTSET_HEADER_SIZE;
