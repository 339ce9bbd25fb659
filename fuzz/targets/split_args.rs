#![no_main]

use libfuzzer_sys::fuzz_target;

use kvprim::{database::sds::split_args, Sds};

fuzz_target!(|data: &[u8]| {
    let Ok(args) = split_args(data) else {
        return;
    };

    // Каждый аргумент, записанный через cat_repr, разбирается обратно в себя.
    for arg in &args {
        let mut line = Sds::empty();
        line.cat_repr(arg.as_bytes()).expect("repr");

        let back = split_args(line.as_bytes()).expect("repr must parse");
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].as_bytes(), arg.as_bytes());
    }
});
