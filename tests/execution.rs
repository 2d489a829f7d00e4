//! End-to-end tests: compile Opal programs, run them in the JIT and check
//! what they print.

use opal::{run, OpalError};

const OBJECT: &str = "class Object\nend\n";

fn output(source: &str) -> String {
    run(source).unwrap_or_else(|err| panic!("program failed: {err}\n{source}"))
}

#[test]
fn prints_integer_arithmetic() {
    assert_eq!(output("print(3 + 4)"), "7\n");
    assert_eq!(output("print(1000 / 10 - 80 + 22)"), "42\n");
    assert_eq!(output("print(2 * (3 + 4))"), "14\n");
}

#[test]
fn prints_negative_integers() {
    assert_eq!(output("print(2 - 5)"), "-3\n");
}

#[test]
fn prints_floats() {
    assert_eq!(output("print(3.5 + 4.25)"), "7.75\n");
    assert_eq!(output("print(1 + 2.5)"), "3.5\n");
}

#[test]
fn prints_strings() {
    assert_eq!(output("print('hello')\nprint(\"world\")"), "hello\nworld\n");
}

#[test]
fn if_takes_the_right_branch() {
    assert_eq!(output("if true then print('A') end"), "A\n");
    assert_eq!(output("if false then print('A') else print('B') end"), "B\n");
    assert_eq!(output("if 2 > 1 then print('yes') else print('no') end"), "yes\n");
}

#[test]
fn comparisons_print_booleans() {
    let source = "print(2 >= 1)\nprint(1 > 2)\nprint(3 == 3)";
    assert_eq!(output(source), "true\nfalse\ntrue\n");
}

#[test]
fn reassigned_bool_keeps_last_value() {
    assert_eq!(output("a = true\na = false\nprint(a)"), "false\n");
}

#[test]
fn reassignment_overwrites_the_slot() {
    assert_eq!(output("a = 1\na = a + 41\nprint(a)"), "42\n");
}

#[test]
fn while_loop_counts() {
    let source = "i = 0\nwhile i < 3\n  print(i)\n  i = i + 1\nend";
    assert_eq!(output(source), "0\n1\n2\n");
}

#[test]
fn break_leaves_the_loop() {
    let source = "while true\n  print('once')\n  break\n  print('never')\nend\nprint('after')";
    assert_eq!(output(source), "once\nafter\n");
}

#[test]
fn continue_skips_the_rest_of_the_body() {
    let source = "\
i = 0
while i < 5
  i = i + 1
  if i == 3 then continue end
  print(i)
end";
    assert_eq!(output(source), "1\n2\n4\n5\n");
}

#[test]
fn for_iterates_a_list() {
    let source = "for item in [2, 4, 6]\n  print(item)\nend";
    assert_eq!(output(source), "2\n4\n6\n");
}

#[test]
fn continue_in_for_advances_the_index() {
    let source = "for item in [1, 2, 3]\n  if item == 2 then continue end\n  print(item)\nend";
    assert_eq!(output(source), "1\n3\n");
}

#[test]
fn list_indexing_reads_elements() {
    assert_eq!(output("xs = [10, 20, 30]\nprint(xs[1])"), "20\n");
}

#[test]
fn methods_return_values() {
    let source = format!(
        "{OBJECT}class Integer\n  def Cint32 do_it(val::Cint32)\n    return val + 1\n  end\nend\n\
         number = Integer()\nprint(number.do_it(41))"
    );
    assert_eq!(output(&source), "42\n");
}

#[test]
fn constructor_receives_arguments() {
    let source = format!(
        "{OBJECT}class Greeter\n  def init(times::Cint32)\n    print(times)\n  end\nend\n\
         g = Greeter(3)"
    );
    assert_eq!(output(&source), "3\n");
}

#[test]
fn inherited_methods_resolve_through_the_parent() {
    let source = format!(
        "{OBJECT}class Base\n  def Cint32 value()\n    return 7\n  end\nend\n\
         class Child < Base\nend\n\
         c = Child()\nprint(c.value())"
    );
    assert_eq!(output(&source), "7\n");
}

#[test]
fn overriding_method_wins() {
    let source = format!(
        "{OBJECT}class Base\n  def Cint32 value()\n    return 1\n  end\nend\n\
         class Child < Base\n  def Cint32 value()\n    return 2\n  end\nend\n\
         c = Child()\nprint(c.value())"
    );
    assert_eq!(output(&source), "2\n");
}

#[test]
fn missing_root_class_is_an_error() {
    let err = run("class Foo\nend").unwrap_err();
    assert!(matches!(err, OpalError::UndefinedParent { .. }));
    assert_eq!(err.to_string(), "Parent class Object not defined");
}

#[test]
fn float_division_truncates_through_integers() {
    assert_eq!(output("print(7.5 / 2.0)"), "3\n");
    assert_eq!(output("x = 9.9\nprint(x / 3)"), "3\n");
}

#[test]
fn integer_conditions_test_against_zero() {
    assert_eq!(output("if 1 then print('A') end"), "A\n");
    assert_eq!(output("n = 0\nif n then print('A') else print('B') end"), "B\n");
    let source = "i = 3\nwhile i\n  print(i)\n  i = i - 1\nend";
    assert_eq!(output(source), "3\n2\n1\n");
}

#[test]
fn float_conditions_test_against_zero() {
    assert_eq!(output("if 0.0 then print('A') else print('B') end"), "B\n");
    assert_eq!(output("f = 0.5\nif f then print('A') else print('B') end"), "A\n");
}

#[test]
fn class_named_vector_leaves_lists_intact() {
    let source = format!("{OBJECT}class vector\nend\nv = vector()\nxs = [1, 2, 3]\nprint(xs[2])");
    assert_eq!(output(&source), "3\n");
}
