//! End-to-end checks of the builtins tables: install, initialize, look up.

use marten_vm_builtins::{
    Builtin, Builtins, Code, CodeTag, EmbeddedBlob,
};

fn blob_with_varied_sizes() -> EmbeddedBlob {
    let sizes: Vec<usize> = (0..Builtin::COUNT).map(|index| 0x30 + (index % 7) * 0x10).collect();
    EmbeddedBlob::from_sizes(0x20_0000, &sizes)
}

fn fully_installed() -> (EmbeddedBlob, Builtins) {
    let blob = blob_with_varied_sizes();
    let mut builtins = Builtins::new(blob.clone());
    for builtin in Builtin::all() {
        builtins.set_code(
            builtin,
            Code::new(
                builtin,
                blob.instruction_start_of(builtin),
                blob.instruction_size_of(builtin),
            ),
        );
    }
    builtins.initialize_isolate_tables();
    (blob, builtins)
}

#[test]
fn builtin_table_identity_after_initialization() {
    let (_, builtins) = fully_installed();
    for builtin in Builtin::all() {
        assert_eq!(builtins.code(builtin).builtin_id, builtin);
        assert_eq!(
            builtins.is_builtin_handle(builtins.code_handle(builtin)),
            Some(builtin)
        );
    }
}

#[test]
fn lookup_roundtrip_over_instruction_ranges() {
    let (blob, builtins) = fully_installed();
    for builtin in Builtin::all() {
        let start = blob.instruction_start_of(builtin);
        let size = blob.instruction_size_of(builtin);
        for pc in [start, start + 1, start + size - 1] {
            assert_eq!(builtins.lookup(pc), Some(builtin), "pc {pc:#x}");
        }
    }
}

#[test]
fn lookup_falls_back_to_table_scan_when_initialized() {
    let blob = blob_with_varied_sizes();
    let mut builtins = Builtins::new(blob.clone());
    // Install one builtin at an address outside the embedded blob, as a
    // runtime-patched stub would be.
    let patched_start = 0x90_0000;
    for builtin in Builtin::all() {
        let (start, size) = if builtin == Builtin::LoadIC {
            (patched_start, 0x40)
        } else {
            (
                blob.instruction_start_of(builtin),
                blob.instruction_size_of(builtin),
            )
        };
        builtins.set_code(builtin, Code::new(builtin, start, size));
    }

    // Before initialization only the embedded blob answers.
    assert_eq!(builtins.lookup(patched_start + 8), None);

    builtins.initialize_isolate_tables();
    assert_eq!(builtins.lookup(patched_start + 8), Some(Builtin::LoadIC));

    builtins.teardown();
    assert_eq!(builtins.lookup(patched_start + 8), None);
}

#[test]
fn entry_tables_mirror_tier0_prefix() {
    let (blob, builtins) = fully_installed();
    for builtin in Builtin::all() {
        assert_eq!(builtins.entry(builtin), blob.instruction_start_of(builtin));
    }
    // The tier-0 prefix is dense, so the mirrored entries equal the head of
    // the full entry table.
    for builtin in Builtin::all().filter(|b| b.is_tier0()) {
        assert_eq!(builtins.entry(builtin), blob.instruction_start_of(builtin));
    }
}

#[test]
fn code_create_events_cover_every_builtin_once() {
    let (_, builtins) = fully_installed();

    let mut events: Vec<(CodeTag, Builtin, String)> = Vec::new();
    let mut logger = |tag: CodeTag, code: &Code, name: &str| {
        events.push((tag, code.builtin_id, name.to_string()));
    };
    builtins.emit_code_create_events(&mut logger);

    assert_eq!(events.len(), Builtin::COUNT);
    for (index, (tag, builtin, name)) in events.iter().enumerate() {
        assert_eq!(builtin.to_index(), index);
        if *builtin >= Builtin::FIRST_BYTECODE_HANDLER {
            assert_eq!(*tag, CodeTag::BytecodeHandler);
        } else {
            assert_eq!(*tag, CodeTag::Builtin);
            assert_eq!(name, builtin.name());
        }
    }

    // Handler events are named by their (bytecode, scale) pair.
    let handler_names: Vec<&str> = events
        .iter()
        .filter(|(tag, ..)| *tag == CodeTag::BytecodeHandler)
        .map(|(_, _, name)| name.as_str())
        .collect();
    assert_eq!(
        handler_names,
        ["Add", "Call", "Jump", "JumpLoop", "Add.Wide", "Add.ExtraWide"]
    );
}

#[test]
fn print_builtin_size_lists_every_builtin() {
    let (_, builtins) = fully_installed();
    let mut out = Vec::new();
    builtins.print_builtin_size(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), Builtin::COUNT);
    assert!(text.contains("ASM Builtin, InterpreterEntryTrampoline,"));
    assert!(text.contains("BCH Builtin, AddExtraWideHandler,"));
}
