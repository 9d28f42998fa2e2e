//! Build phase integration tests: files, classes and functions become groups
//! and nodes.

mod common;

use common::*;
use canopy_core::graph::{EntityRef, GroupKind, PointsTo, Program, ROOT_NODE_TOKEN};
use canopy_core::languages::Language;
use canopy_core::phases::build::build_file_group;
use canopy_core::phases::parsing::ParsedFile;

// ===========================================================================
// File groups
// ===========================================================================

#[test]
fn one_file_group_per_source_in_name_order() {
    let r = run_build("py_ambiguous");
    let tokens: Vec<_> = r
        .program
        .files()
        .iter()
        .map(|&f| r.program.group(f).token.clone())
        .collect();
    assert_eq!(tokens, vec!["main", "one", "shapes", "two"]);
    assert!(r
        .program
        .files()
        .iter()
        .all(|&f| r.program.group(f).kind == GroupKind::File));
}

#[test]
fn every_file_has_a_root_node() {
    let r = run_build("py_ambiguous");
    for &file in r.program.files() {
        let root = r.program.group(file).root_node.expect("file without root node");
        assert_eq!(r.program.node(root).token, ROOT_NODE_TOKEN);
    }
}

#[test]
fn python_files_are_importable_by_stem() {
    let r = run_build("py_cross_file");
    let b = find_group(&r.program, "b");
    assert!(r.program.group(b).import_tokens.contains(&"b".to_string()));
    let func_b = find_node(&r.program, "b::func_b");
    assert!(r
        .program
        .node(func_b)
        .import_tokens
        .contains(&"b.func_b".to_string()));
}

// ===========================================================================
// Nesting
// ===========================================================================

#[test]
fn nested_functions_and_classes() {
    let r = run_build("py_nested");
    assert_eq!(group_tokens(&r.program), vec!["nested", "Box", "Lid"]);

    let names = node_names(&r.program);
    for expected in [
        "nested::outer",
        "nested::inner",
        "nested::helper",
        "nested::factory",
        "nested::(global)",
        "nested::Box.close",
        "nested::Lid.open",
    ] {
        assert!(names.contains(expected), "missing {expected} in {names:?}");
    }
    assert_eq!(names.len(), 7);

    let inner = find_node(&r.program, "nested::inner");
    assert_eq!(r.program.node(inner).line_number, 2);
    assert_eq!(r.program.node(inner).parent, r.program.files()[0]);
}

#[test]
fn classes_inside_functions_are_skipped() {
    let r = run_build("py_nested");
    assert!(r
        .program
        .groups()
        .into_iter()
        .all(|g| r.program.group(g).token != "Local"));
}

#[test]
fn idle_class_bodies_get_no_root() {
    let r = run_build("py_nested");
    let class = find_group(&r.program, "Box");
    assert_eq!(r.program.group(class).root_node, None);
}

#[test]
fn busy_class_bodies_get_a_root() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("settings.py");
    std::fs::write(&path, "class Config:\n    DEBUG = load()\n\n    def get(self):\n        pass\n").unwrap();
    let parsed = ParsedFile::parse(Language::Python, &path).unwrap();
    let mut program = Program::new();
    build_file_group(&Language::Python, &parsed, &mut program);

    let class = find_group(&program, "Config");
    let root = program.group(class).root_node.expect("class root node");
    assert_eq!(program.node(root).calls.len(), 1);
    assert_eq!(program.node(root).calls[0].token, "load");
}

// ===========================================================================
// Methods
// ===========================================================================

#[test]
fn methods_bind_self_to_their_class() {
    let r = run_build("py_nested");
    let class = find_group(&r.program, "Box");
    let close = find_node(&r.program, "nested::Box.close");
    let self_binding = r
        .program
        .node(close)
        .variables
        .iter()
        .find(|v| v.token == "self")
        .expect("self binding");
    assert_eq!(self_binding.points_to, PointsTo::Resolved(EntityRef::Group(class)));
}

#[test]
fn python_constructors_are_flagged() {
    let r = run_build("py_inherits");
    let init = find_node(&r.program, "animals::Dog.__init__");
    assert!(r.program.node(init).is_constructor);
    let bark = find_node(&r.program, "animals::Dog.bark");
    assert!(!r.program.node(bark).is_constructor);
    let dog = find_group(&r.program, "Dog");
    assert_eq!(r.program.group(dog).inherits, vec!["Animal".to_string()]);
}

#[test]
fn javascript_constructors_use_a_reserved_token() {
    let r = run_build("js_classes");
    assert_eq!(r.language, Language::JavaScript);
    let ctor = find_node(&r.program, "app::Store.(constructor)");
    assert!(r.program.node(ctor).is_constructor);
    let store = find_group(&r.program, "Store");
    assert_eq!(r.program.constructor_of(store), Some(ctor));
    assert_eq!(r.program.group(store).inherits, vec!["Base".to_string()]);
}

// ===========================================================================
// Namespaces
// ===========================================================================

#[test]
fn php_namespaces_own_the_statements_after_them() {
    let r = run_build("php_namespaces");
    assert_eq!(r.language, Language::Php);
    let models = find_group(&r.program, "App.Models");
    let group = r.program.group(models);
    assert_eq!(group.kind, GroupKind::Namespace);
    assert!(group.root_node.is_some());
    assert_eq!(group.import_tokens, vec!["App.Models".to_string()]);

    // The file is also called User; the class is the namespace's subgroup.
    let user = group.subgroups[0];
    assert_eq!(r.program.group(user).token, "User");
    assert_eq!(r.program.group(user).parent, Some(models));
    assert_eq!(
        r.program.group(user).import_tokens,
        vec!["App.Models.User".to_string()]
    );
    let format_name = find_node(&r.program, "User::App.Models.format_name");
    assert_eq!(
        r.program.node(format_name).import_tokens,
        vec!["App.Models.format_name".to_string()]
    );
}

#[test]
fn ruby_modules_are_namespaces_and_members_see_each_other() {
    let r = run_build("rb_modules");
    assert_eq!(r.language, Language::Ruby);
    let shapes = find_group(&r.program, "Shapes");
    assert_eq!(r.program.group(shapes).kind, GroupKind::Namespace);
    assert_eq!(r.program.group(shapes).display_kind, "Module");

    let init = find_node(&r.program, "shapes::Square.initialize");
    assert!(r.program.node(init).is_constructor);
    let validate = find_node(&r.program, "shapes::Square.validate");
    let binding = r
        .program
        .node(init)
        .variables
        .iter()
        .find(|v| v.token == "validate")
        .expect("sibling binding");
    assert_eq!(binding.points_to, PointsTo::Resolved(EntityRef::Node(validate)));
    assert_eq!(binding.line_number, 0);
}
