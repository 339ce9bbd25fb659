//! Модуль динамической бинарно-безопасной строки (Sds).
//!
//! `Sds` хранит явную длину и запас свободного места за содержимым, поэтому
//! `len()` и `avail()` работают за O(1), а серия дописываний в конец
//! обходится амортизированно линейным числом копирований. Содержимое может
//! включать нулевые байты; за последним байтом всегда лежит терминатор `0`,
//! который в длину не входит.
//!
//! Модуль также содержит:
//! - [`split_len`] и [`join`] для разбиения и склейки по разделителю;
//! - [`split_args`] для разбора строки команды с кавычками и экранированием;
//! - бинарное представление `[len][free][buf]` (см. [`Sds::to_blob`]).

mod sds_base;
mod sds_blob;
mod sds_split;

pub use sds_base::{Sds, SDS_HEADER_SIZE, SDS_MAX_LEN, SDS_MAX_PREALLOC};
pub use sds_split::{join, split_args, split_len};
