#![allow(dead_code)]

use mathvm::{Engine, EngineOptions, Error, ExecutionOptions, Program};
use once_cell::sync::Lazy;

pub static ENGINE: Lazy<Engine> = Lazy::new(|| Engine::new(EngineOptions::default()));

/// Engine with a small call-depth limit, for runaway recursion.
pub static SHALLOW_ENGINE: Lazy<Engine> = Lazy::new(|| {
    Engine::new(EngineOptions {
        execution: ExecutionOptions {
            max_call_depth: 64,
            ..ExecutionOptions::default()
        },
    })
});

/// Compile and run `source`, returning everything it printed.
pub fn run(source: &str) -> Result<String, Error> {
    run_on(&ENGINE, source)
}

pub fn run_on(engine: &Engine, source: &str) -> Result<String, Error> {
    let mut out = Vec::new();
    engine.run(source, &mut out)?;
    Ok(String::from_utf8(out).expect("program output is UTF-8"))
}

pub fn compile(source: &str) -> Program {
    ENGINE
        .compile(source)
        .unwrap_or_else(|e| panic!("Compilation failed: {}\n{}", source, e))
}

/// Declare a test that runs a program and checks its output or error.
macro_rules! test_case {
    ($name:ident, input: $input:expr, output: $output:expr $(,)?) => {
        #[test]
        fn $name() {
            let output = cases::run($input)
                .unwrap_or_else(|e| panic!("{}\n{}", $input, mathvm::render_error_to_string_no_color(&e)));
            pretty_assertions::assert_eq!(output, $output);
        }
    };
    ($name:ident, input: $input:expr, error: $pattern:pat $(if $guard:expr)? $(,)?) => {
        #[test]
        fn $name() {
            match cases::run($input) {
                Err($pattern) $(if $guard)? => {}
                other => panic!(
                    "Expected {} for {:?}, got {:?}",
                    stringify!($pattern),
                    $input,
                    other
                ),
            }
        }
    };
}
