//! Variables exchanged with the host through `Engine::execute`.

mod cases;

use mathvm::{Error, Var};
use pretty_assertions::assert_eq;

fn execute(source: &str, vars: &mut [Var]) -> Result<String, Error> {
    let program = cases::compile(source);
    let mut out = Vec::new();
    cases::ENGINE.execute(&program, vars, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn seeds_and_writes_back_ints() {
    let mut vars = [Var::int("n", 6), Var::int("sq", 0)];
    let out = execute("int n; int sq; sq = n * n; print(n);", &mut vars).unwrap();
    assert_eq!(out, "6");
    assert_eq!(vars, [Var::int("n", 6), Var::int("sq", 36)]);
}

#[test]
fn seeds_and_writes_back_doubles_and_strings() {
    let mut vars = [
        Var::double("r", 2.0),
        Var::double("area", 0.0),
        Var::string("label", "circle"),
    ];
    let source = "double r; double area; string label;
                  area = 3.0 * r * r;
                  print(label);
                  label = 'done';";
    let out = execute(source, &mut vars).unwrap();
    assert_eq!(out, "circle");
    assert_eq!(
        vars,
        [
            Var::double("r", 2.0),
            Var::double("area", 12.0),
            Var::string("label", "done"),
        ]
    );
}

#[test]
fn strings_not_in_the_program_survive_a_round_trip() {
    let mut vars = [Var::string("s", "from the host")];
    let out = execute("string s; print(s, '!');", &mut vars).unwrap();
    assert_eq!(out, "from the host!");
    assert_eq!(vars, [Var::string("s", "from the host")]);
}

#[test]
fn unseeded_globals_start_at_zero() {
    let mut vars = [Var::int("x", 99)];
    let out = execute("int y; print(y);", &mut vars).unwrap();
    assert_eq!(out, "0");
    // Names the program does not declare are left alone.
    assert_eq!(vars, [Var::int("x", 99)]);
}

#[test]
fn type_mismatch_is_rejected_before_running() {
    let mut vars = [Var::double("n", 1.5)];
    let err = execute("int n; print('ran');", &mut vars).unwrap_err();
    assert!(matches!(err, Error::Api(ref msg) if msg.contains("'n'")), "{:?}", err);
    assert_eq!(vars, [Var::double("n", 1.5)]);
}

#[test]
fn nested_block_variables_are_not_exchanged() {
    let mut vars = [Var::int("inner", 5)];
    let out = execute("{ int inner; print(inner); inner = 7; }", &mut vars).unwrap();
    assert_eq!(out, "0");
    assert_eq!(vars, [Var::int("inner", 5)]);
}

#[test]
fn globals_updated_inside_functions_are_written_back() {
    let mut vars = [Var::int("count", 10)];
    let source = "int count;
                  function void bump(int by) { count += by; }
                  bump(1); bump(2);";
    execute(source, &mut vars).unwrap();
    assert_eq!(vars, [Var::int("count", 13)]);
}

#[test]
fn runtime_error_leaves_variables_untouched() {
    let mut vars = [Var::int("x", 1), Var::int("zero", 0)];
    let err = execute("int x; int zero; x = 42; x = x / zero;", &mut vars).unwrap_err();
    assert!(matches!(err, Error::Runtime { .. }), "{:?}", err);
    assert_eq!(vars, [Var::int("x", 1), Var::int("zero", 0)]);
}

#[test]
fn program_can_be_executed_repeatedly() {
    let program = cases::compile("int n; n = n + 1;");
    let mut vars = [Var::int("n", 0)];
    for expected in 1..=3 {
        cases::ENGINE.execute(&program, &mut vars, std::io::sink()).unwrap();
        assert_eq!(vars, [Var::int("n", expected)]);
    }
}

#[test]
fn compilation_error_keeps_the_source() {
    let source = "int x;\nx = y;";
    let err = cases::ENGINE.compile(source).unwrap_err();
    let Error::Compilation { diagnostic, source: kept } = err else {
        panic!("Expected compilation error, got {:?}", err);
    };
    assert_eq!(kept, source);
    assert_eq!(diagnostic.code.as_deref(), Some("C001"));
    assert_eq!(&source[diagnostic.span.0.clone()], "y");
}
