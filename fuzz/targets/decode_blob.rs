#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use kvprim::{IntSet, Sds};

#[derive(Debug, Arbitrary)]
enum BlobKind {
    IntSet,
    Sds,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    kind: BlobKind,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    // Декодер не должен паниковать ни на каких данных, а успешно
    // разобранный blob должен кодироваться обратно в те же байты.
    match input.kind {
        BlobKind::IntSet => {
            if let Ok(set) = IntSet::from_blob(&input.data) {
                set.debug_assert_invariants();
                let blob = set.to_blob().expect("re-encode decoded intset");
                assert_eq!(blob, input.data);
            }
        }
        BlobKind::Sds => {
            if let Ok(s) = Sds::from_blob(&input.data) {
                s.debug_assert_invariants();
                let blob = s.to_blob().expect("re-encode decoded sds");
                assert_eq!(blob, input.data);
            }
        }
    }
});
