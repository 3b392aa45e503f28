use std::path::PathBuf;

use l2c::{
    Error,
    backend::{CodegenOptions, Target},
    frontend::error::ParseError,
    vm::MachineConfig,
};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(format!("{name}.l2"))
}

#[test]
fn demos_run_to_their_expected_results() {
    for (name, expected) in [
        ("arithmetic", 20),
        ("escape", 9),
        ("countdown", 55),
        ("comparison", 1),
    ] {
        let program = l2c::read_program(&demo(name)).unwrap();
        let outcome =
            l2c::run(&program, &CodegenOptions::default(), MachineConfig::default()).unwrap();

        assert_eq!(outcome.result, expected, "{name}");
    }
}

#[test]
fn compiled_demo_round_trips_through_a_file() {
    let program = l2c::read_program(&demo("arithmetic")).unwrap();
    let options = CodegenOptions {
        target: Target::x86_64AppleDarwin,
        heap_size: 4096,
        ..CodegenOptions::default()
    };

    let listing = l2c::compile(&program, &options, true).unwrap();

    let temp = mktemp::Temp::new_file().unwrap();
    let path = temp.to_path_buf();
    std::fs::write(&path, &listing).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, listing);
    assert!(written.starts_with("    .globl _main\n"));
    assert!(written.contains("leaq _multiply(%rip), %rax"));
    assert!(written.ends_with("    .lcomm _heap, 4096, 4\n"));
}

#[test]
fn parse_errors_point_at_the_offending_line() {
    let temp = mktemp::Temp::new_file().unwrap();
    let path = temp.to_path_buf();
    std::fs::write(&path, "main:\n    set_result 1\n    frobnicate\n").unwrap();

    match l2c::read_program(&path) {
        Err(Error::Parse(ParseError::UnknownInstruction { tag, location })) => {
            assert_eq!(tag, "frobnicate");
            assert_eq!(location.line, 3);
            assert_eq!(location.column, 5);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_files_are_read_errors() {
    assert!(matches!(
        l2c::read_program(&demo("does_not_exist")),
        Err(Error::Read { .. })
    ));
}
