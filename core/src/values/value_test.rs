use super::{Value, VarType};

#[test]
fn test_zero_defaults_follow_declared_type() {
    assert_eq!(Value::zero(VarType::Int), Some(Value::Int(0)));
    assert_eq!(Value::zero(VarType::Double), Some(Value::Double(0.0)));
    assert_eq!(Value::zero(VarType::String), Some(Value::Str(0)));
    assert_eq!(Value::zero(VarType::Void), None);
    assert_eq!(Value::zero(VarType::Invalid), None);
}

#[test]
fn test_var_type_of_value() {
    assert_eq!(Value::Int(3).var_type(), VarType::Int);
    assert_eq!(Value::Double(0.5).var_type(), VarType::Double);
    assert_eq!(Value::Str(7).var_type(), VarType::String);
}

#[test]
fn test_accessors_reject_other_variants() {
    assert_eq!(Value::Int(42).as_int(), Some(42));
    assert_eq!(Value::Int(42).as_double(), None);
    assert_eq!(Value::Double(1.5).as_double(), Some(1.5));
    assert_eq!(Value::Str(2).as_string_id(), Some(2));
    assert_eq!(Value::Str(2).as_int(), None);
}

#[test]
fn test_display() {
    assert_eq!(Value::Int(-5).to_string(), "-5");
    assert_eq!(Value::Double(0.5).to_string(), "0.5");
    assert_eq!(Value::Str(3).to_string(), "<string #3>");
}
