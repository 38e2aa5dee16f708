//! Declaration checks over a populated code base.

mod common;

use common::Session;
use strix_analysis::{AnalysisEnv, DeclarationChecker};
use strix_ast::ModifierFlags;
use strix_codebase::{ClassConstant, Clazz, Func, Location, Method, Parameter, Property, Signature};
use strix_diagnostics::issues;
use strix_types::{
    FullyQualifiedClassConstantName, FullyQualifiedClassName, FullyQualifiedFunctionName, FullyQualifiedMethodName,
    FullyQualifiedPropertyName, TypeId, UnionType,
};

fn fqcn(name: &str) -> FullyQualifiedClassName {
    FullyQualifiedClassName::from_full_name(name)
}

fn method(class: &str, name: &str, params: Vec<Parameter>, return_type: UnionType, line: u32) -> Method {
    let mut method = Method::new(
        FullyQualifiedMethodName::new(fqcn(class), name),
        Signature::new(params, return_type),
    );
    method.location = Location::new("src/classes.php", line);
    method
}

/// `\Base` and `\Child extends \Base`, with `\Base::f(int $a): string`.
fn base_and_child(s: &mut Session) {
    s.codebase.add_class(Clazz::new(&s.registry, fqcn("\\Base")));
    let mut child = Clazz::new(&s.registry, fqcn("\\Child"));
    child.set_parent(&s.registry, fqcn("\\Base"));
    s.codebase.add_class(child);
    s.codebase.add_method(method(
        "\\Base",
        "f",
        vec![Parameter::new("a", UnionType::of(TypeId::INT))],
        UnionType::of(TypeId::STRING),
        3,
    ));
}

fn check_class(s: &mut Session, class: &str) {
    let mut env = AnalysisEnv::new(&s.registry, &mut s.codebase, &s.options, &mut s.issues);
    DeclarationChecker::new(&mut env).check_class(&fqcn(class));
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn test_compatible_override_is_silent() {
    let mut s = Session::new();
    base_and_child(&mut s);
    s.codebase.add_method(method(
        "\\Child",
        "f",
        vec![Parameter::new("a", UnionType::of(TypeId::INT)), Parameter::optional("b", UnionType::empty())],
        UnionType::of(TypeId::STRING),
        10,
    ));
    check_class(&mut s, "\\Child");
    assert!(s.issues.is_empty(), "{:?}", s.issue_names());
}

#[test]
fn test_extra_required_parameter_is_reported() {
    let mut s = Session::new();
    base_and_child(&mut s);
    s.codebase.add_method(method(
        "\\Child",
        "f",
        vec![
            Parameter::new("a", UnionType::of(TypeId::INT)),
            Parameter::new("b", UnionType::of(TypeId::INT)),
        ],
        UnionType::of(TypeId::STRING),
        10,
    ));
    check_class(&mut s, "\\Child");
    assert_eq!(s.issue_names(), vec!["ParamSignatureMismatch"]);
    let issue = &s.issues.issues()[0];
    assert_eq!(issue.line, 10);
    assert_eq!(issue.args[0], "\\Child::f(int $a, int $b): string");
    assert_eq!(issue.args[1], "\\Base::f(int $a): string");
    assert_eq!(issue.args[2], " defined in src/classes.php:3");
}

#[test]
fn test_incompatible_return_type_is_reported() {
    let mut s = Session::new();
    base_and_child(&mut s);
    s.codebase.add_method(method(
        "\\Child",
        "f",
        vec![Parameter::new("a", UnionType::of(TypeId::INT))],
        UnionType::of(TypeId::INT),
        10,
    ));
    check_class(&mut s, "\\Child");
    assert!(s.issues.has(&issues::ParamSignatureMismatch));
}

#[test]
fn test_narrowed_visibility_is_reported() {
    let mut s = Session::new();
    base_and_child(&mut s);
    let mut narrowed = method(
        "\\Child",
        "f",
        vec![Parameter::new("a", UnionType::of(TypeId::INT))],
        UnionType::of(TypeId::STRING),
        10,
    );
    narrowed.flags = ModifierFlags::PRIVATE;
    s.codebase.add_method(narrowed);
    check_class(&mut s, "\\Child");
    assert_eq!(s.issue_names(), vec!["AccessSignatureMismatch"]);
    assert_eq!(s.issues.issues()[0].args[2], "src/classes.php");
}

// ============================================================================
// @throws
// ============================================================================

#[test]
fn test_function_throws_checks() {
    let mut s = Session::new();
    s.codebase.add_class(Clazz::interface(&s.registry, fqcn("\\Throwable")));
    let mut exception = Clazz::new(&s.registry, fqcn("\\Exception"));
    exception.add_interface(&s.registry, fqcn("\\Throwable"));
    s.codebase.add_class(exception);
    let mut failure = Clazz::new(&s.registry, fqcn("\\Failure"));
    failure.set_parent(&s.registry, fqcn("\\Exception"));
    s.codebase.add_class(failure);
    s.codebase.add_class(Clazz::interface(&s.registry, fqcn("\\Marker")));

    let mut signature = Signature::new(vec![], UnionType::empty());
    signature.throws = UnionType::from_fully_qualified_string(&s.registry, "\\Failure|\\Marker").expect("parses");
    let mut func = Func::new(FullyQualifiedFunctionName::from_full_name("risky"), signature);
    func.location = Location::new("src/functions.php", 7);

    {
        let mut env = AnalysisEnv::new(&s.registry, &mut s.codebase, &s.options, &mut s.issues);
        DeclarationChecker::new(&mut env).check_function(&func);
    }
    assert_eq!(s.issue_names(), vec!["TypeInvalidThrowsIsInterface"]);
    assert_eq!(s.issues.issues()[0].line, 7);
}

// ============================================================================
// Member types
// ============================================================================

#[test]
fn test_member_comment_types() {
    let mut s = Session::new();
    s.codebase.add_class(Clazz::new(&s.registry, fqcn("\\Config")));

    let mut constant = ClassConstant::new(
        FullyQualifiedClassConstantName::new(fqcn("\\Config"), "DEFAULT"),
        UnionType::of(TypeId::INT),
    );
    constant.comment_type = UnionType::from_fully_qualified_string(&s.registry, "\\Config").expect("parses");
    s.codebase.add_class_constant(constant);

    let property = Property::new(
        FullyQualifiedPropertyName::new(fqcn("\\Config"), "loader"),
        UnionType::from_fully_qualified_string(&s.registry, "?\\Loader").expect("parses"),
    );
    s.codebase.add_property(property);

    check_class(&mut s, "\\Config");
    let mut names = s.issue_names();
    names.sort();
    assert_eq!(names, vec!["CommentObjectInClassConstantType", "UndeclaredTypeProperty"]);
}
