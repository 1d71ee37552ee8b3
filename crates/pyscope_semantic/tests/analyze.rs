use anyhow::{Context, Result};
use pyscope_ast::{
    comprehension, parameters, Ast, ExceptHandler, ExprNamed, Operator, Stmt, StmtAugAssign,
    StmtDelete, StmtFunctionDef, StmtTry, StmtWith, TypeParam, TypeParamTypeVar, TypeParams,
    WithItem,
};
use pyscope_semantic::{
    analyze, analyze_with_builtins, AccessId, AssignmentId, AssignmentKind, QualifiedNameSource,
    ScopeError, ScopeId, ScopeKind, SemanticModel,
};

fn assignment_named(
    model: &SemanticModel<'_>,
    scope: ScopeId,
    name: &str,
) -> Option<AssignmentId> {
    model.assignments_in(scope).find(|&id| model[id].name == name)
}

fn sole_access(model: &SemanticModel<'_>, node: pyscope_ast::ExprId) -> Option<AccessId> {
    match model.accesses_of(node) {
        [access] => Some(*access),
        _ => None,
    }
}

fn qualified(model: &SemanticModel<'_>, node: impl Into<pyscope_ast::NodeKey>) -> Vec<String> {
    model
        .qualified_names_of(node)
        .into_iter()
        .map(|qualified| qualified.name)
        .collect()
}

#[test]
fn module_level_binding_and_reference() -> Result<()> {
    // x = 1
    // print(x)
    let mut ast = Ast::new();
    let one = ast.int(1);
    let x_store = ast.name_store("x");
    let assign = ast.assign(x_store, one);
    let print_load = ast.name_load("print");
    let x_load = ast.name_load("x");
    let call = ast.call(print_load, vec![x_load]);
    let use_stmt = ast.expr_stmt(call);
    ast.body = vec![assign, use_stmt];

    let model = analyze(&ast)?;
    let global = ScopeId::global();
    assert!(model[global].kind.is_module());
    assert_eq!(model.scope_of(call), Some(global));
    assert_eq!(model.scope_of(assign), Some(global));

    let x = assignment_named(&model, global, "x").context("x not recorded")?;
    let access = sole_access(&model, x_load).context("x access missing")?;
    assert_eq!(model[access].assignments(), [x]);
    assert_eq!(model[x].accesses(), [access]);
    assert!(model[x].is_used());

    let print_access = sole_access(&model, print_load).context("print access missing")?;
    let print_assignment = model[print_access].assignments()[0];
    assert!(model[print_assignment].kind.is_builtin());
    assert_eq!(model[print_assignment].scope, ScopeId::builtin());
    Ok(())
}

#[test]
fn access_before_assignment_is_unresolved() -> Result<()> {
    // y = x
    // x = 1
    let mut ast = Ast::new();
    let x_load = ast.name_load("x");
    let y_store = ast.name_store("y");
    let first = ast.assign(y_store, x_load);
    let one = ast.int(1);
    let x_store = ast.name_store("x");
    let second = ast.assign(x_store, one);
    ast.body = vec![first, second];

    let model = analyze(&ast)?;
    let access = sole_access(&model, x_load).context("x access missing")?;
    assert!(model[access].assignments().is_empty());

    let x = assignment_named(&model, ScopeId::global(), "x").context("x not recorded")?;
    assert!(!model[x].is_used());
    Ok(())
}

#[test]
fn function_body_sees_later_module_assignment() -> Result<()> {
    // def f(): return x
    // x = 1
    let mut ast = Ast::new();
    let x_load = ast.name_load("x");
    let ret = ast.return_stmt(Some(x_load));
    let def = ast.function_def("f", parameters(&[]), vec![ret]);
    let one = ast.int(1);
    let x_store = ast.name_store("x");
    let assign = ast.assign(x_store, one);
    ast.body = vec![def, assign];

    let model = analyze(&ast)?;
    let function_scope = model.scope_of(ret).context("no scope for body")?;
    assert!(model[function_scope].kind.is_function());
    assert_eq!(model[function_scope].name(), Some("f"));

    let x = assignment_named(&model, ScopeId::global(), "x").context("x not recorded")?;
    let access = sole_access(&model, x_load).context("x access missing")?;
    assert_eq!(model[access].assignments(), [x]);
    assert_eq!(model[access].scope, function_scope);
    Ok(())
}

#[test]
fn shadowed_read_falls_back_to_enclosing_scope() -> Result<()> {
    // x = 1
    // def f():
    //     x = x
    let mut ast = Ast::new();
    let one = ast.int(1);
    let outer_store = ast.name_store("x");
    let outer_assign = ast.assign(outer_store, one);
    let inner_load = ast.name_load("x");
    let inner_store = ast.name_store("x");
    let inner_assign = ast.assign(inner_store, inner_load);
    let def = ast.function_def("f", parameters(&[]), vec![inner_assign]);
    ast.body = vec![outer_assign, def];

    let model = analyze(&ast)?;
    let function_scope = model.scope_of(inner_assign).context("no scope")?;
    let global_x = assignment_named(&model, ScopeId::global(), "x").context("global x")?;
    let local_x = assignment_named(&model, function_scope, "x").context("local x")?;

    let access = sole_access(&model, inner_load).context("x access missing")?;
    assert_eq!(model[access].assignments(), [global_x]);
    assert_eq!(model[global_x].accesses(), [access]);
    assert!(!model[local_x].is_used());
    Ok(())
}

#[test]
fn class_body_is_opaque_to_methods() -> Result<()> {
    // class C:
    //     attr = 1
    //     def method(self):
    //         return attr
    let mut ast = Ast::new();
    let one = ast.int(1);
    let attr_store = ast.name_store("attr");
    let attr_assign = ast.assign(attr_store, one);
    let attr_load = ast.name_load("attr");
    let ret = ast.return_stmt(Some(attr_load));
    let method = ast.function_def("method", parameters(&["self"]), vec![ret]);
    let class = ast.class_def("C", vec![], vec![attr_assign, method]);
    ast.body = vec![class];

    let model = analyze(&ast)?;
    let class_scope = model.scope_of(attr_assign).context("class scope")?;
    assert!(model[class_scope].kind.is_class());
    assert!(model[class_scope].has("attr"));

    let access = sole_access(&model, attr_load).context("attr access")?;
    assert!(model[access].assignments().is_empty());
    Ok(())
}

#[test]
fn type_parameter_bound_sees_class_body() -> Result<()> {
    // class C:
    //     X = 1
    //     def m[T: X](self): ...
    let mut ast = Ast::new();
    let one = ast.int(1);
    let x_store = ast.name_store("X");
    let x_assign = ast.assign(x_store, one);
    let bound = ast.name_load("X");
    let pass = ast.push_stmt(Stmt::Pass);
    let method = ast.push_stmt(StmtFunctionDef {
        is_async: false,
        name: "m".into(),
        type_params: Some(TypeParams {
            params: vec![TypeParam::TypeVar(TypeParamTypeVar {
                name: "T".into(),
                bound: Some(bound),
            })],
        }),
        parameters: parameters(&["self"]),
        returns: None,
        body: vec![pass],
        decorator_list: Vec::new(),
    });
    let class = ast.class_def("C", vec![], vec![x_assign, method]);
    ast.body = vec![class];

    let model = analyze(&ast)?;
    let annotation_scope = model.scope_of(bound).context("bound scope")?;
    assert!(model[annotation_scope].kind.is_annotation());
    assert!(model[annotation_scope].has("T"));

    let class_scope = model.scope_of(x_assign).context("class scope")?;
    let class_x = assignment_named(&model, class_scope, "X").context("class X")?;
    let access = sole_access(&model, bound).context("bound access")?;
    assert_eq!(model[access].assignments(), [class_x]);
    Ok(())
}

#[test]
fn global_declaration_redirects_assignment() -> Result<()> {
    // x = 1
    // def f():
    //     global x
    //     x = 2
    let mut ast = Ast::new();
    let one = ast.int(1);
    let outer_store = ast.name_store("x");
    let outer_assign = ast.assign(outer_store, one);
    let global_decl = ast.global_stmt(&["x"]);
    let two = ast.int(2);
    let inner_store = ast.name_store("x");
    let inner_assign = ast.assign(inner_store, two);
    let def = ast.function_def("f", parameters(&[]), vec![global_decl, inner_assign]);
    ast.body = vec![outer_assign, def];

    let model = analyze(&ast)?;
    let function_scope = model.scope_of(inner_assign).context("no scope")?;
    assert!(!model[function_scope].has("x"));
    assert_eq!(model[ScopeId::global()].get("x").len(), 2);
    Ok(())
}

#[test]
fn global_declaration_at_module_level_is_inert() -> Result<()> {
    // global x
    // x = 1
    let mut ast = Ast::new();
    let decl = ast.global_stmt(&["x"]);
    let one = ast.int(1);
    let x_store = ast.name_store("x");
    let assign = ast.assign(x_store, one);
    ast.body = vec![decl, assign];

    let model = analyze(&ast)?;
    assert_eq!(model[ScopeId::global()].get("x").len(), 1);
    Ok(())
}

#[test]
fn nonlocal_declaration_redirects_to_enclosing_function() -> Result<()> {
    // def outer():
    //     x = 1
    //     def inner():
    //         nonlocal x
    //         x = 2
    let mut ast = Ast::new();
    let two = ast.int(2);
    let inner_store = ast.name_store("x");
    let inner_assign = ast.assign(inner_store, two);
    let decl = ast.nonlocal_stmt(&["x"]);
    let inner = ast.function_def("inner", parameters(&[]), vec![decl, inner_assign]);
    let one = ast.int(1);
    let outer_store = ast.name_store("x");
    let outer_assign = ast.assign(outer_store, one);
    let outer = ast.function_def("outer", parameters(&[]), vec![outer_assign, inner]);
    ast.body = vec![outer];

    let model = analyze(&ast)?;
    let outer_scope = model.scope_of(outer_assign).context("outer scope")?;
    let inner_scope = model.scope_of(inner_assign).context("inner scope")?;
    assert_eq!(model[outer_scope].get("x").len(), 2);
    assert!(!model[inner_scope].has("x"));
    Ok(())
}

#[test]
fn nonlocal_at_module_level_is_an_error() {
    let mut ast = Ast::new();
    let decl = ast.nonlocal_stmt(&["x"]);
    ast.body = vec![decl];

    match analyze(&ast) {
        Err(ScopeError::NonlocalAtModuleLevel { name, .. }) => assert_eq!(name, "x"),
        other => panic!("expected nonlocal error, got {other:?}"),
    }
}

#[test]
fn builtin_assignment_is_shared_between_scopes() -> Result<()> {
    // print(1)
    // def f(): print(2)
    let mut ast = Ast::new();
    let first_print = ast.name_load("print");
    let one = ast.int(1);
    let first_call = ast.call(first_print, vec![one]);
    let first = ast.expr_stmt(first_call);
    let second_print = ast.name_load("print");
    let two = ast.int(2);
    let second_call = ast.call(second_print, vec![two]);
    let second = ast.expr_stmt(second_call);
    let def = ast.function_def("f", parameters(&[]), vec![second]);
    ast.body = vec![first, def];

    let model = analyze(&ast)?;
    let first_access = sole_access(&model, first_print).context("first access")?;
    let second_access = sole_access(&model, second_print).context("second access")?;
    let first_assignment = model[first_access].assignments()[0];
    let second_assignment = model[second_access].assignments()[0];
    assert_eq!(first_assignment, second_assignment);
    assert!(model[first_assignment].kind.is_builtin());
    Ok(())
}

#[test]
fn custom_builtin_table_replaces_the_default() -> Result<()> {
    let mut ast = Ast::new();
    let frob = ast.name_load("frobnicate");
    let print_load = ast.name_load("print");
    let call = ast.call(frob, vec![print_load]);
    let stmt = ast.expr_stmt(call);
    ast.body = vec![stmt];

    let model = analyze_with_builtins(&ast, &["frobnicate"])?;
    let frob_access = sole_access(&model, frob).context("frobnicate access")?;
    assert!(model[model[frob_access].assignments()[0]].kind.is_builtin());

    let print_access = sole_access(&model, print_load).context("print access")?;
    assert!(model[print_access].assignments().is_empty());
    Ok(())
}

#[test]
fn nested_comprehension_clauses_share_one_scope() -> Result<()> {
    // data = 1
    // flat = [y for x in data for y in x]
    let mut ast = Ast::new();
    let one = ast.int(1);
    let data_store = ast.name_store("data");
    let data_assign = ast.assign(data_store, one);
    let data_load = ast.name_load("data");
    let x_target = ast.name_store("x");
    let x_iter = ast.name_load("x");
    let y_target = ast.name_store("y");
    let y_elt = ast.name_load("y");
    let comp = ast.list_comp(
        y_elt,
        vec![
            comprehension(x_target, data_load, vec![]),
            comprehension(y_target, x_iter, vec![]),
        ],
    );
    let flat_store = ast.name_store("flat");
    let flat_assign = ast.assign(flat_store, comp);
    ast.body = vec![data_assign, flat_assign];

    let model = analyze(&ast)?;
    // The first iterable is evaluated in the enclosing scope.
    assert_eq!(model.scope_of(data_load), Some(ScopeId::global()));
    let comp_scope = model.scope_of(x_iter).context("comp scope")?;
    assert!(model[comp_scope].kind.is_comprehension());

    let x = assignment_named(&model, comp_scope, "x").context("x target")?;
    let y = assignment_named(&model, comp_scope, "y").context("y target")?;
    let x_access = sole_access(&model, x_iter).context("x access")?;
    let y_access = sole_access(&model, y_elt).context("y access")?;
    assert_eq!(model[x_access].assignments(), [x]);
    assert_eq!(model[y_access].assignments(), [y]);
    Ok(())
}

#[test]
fn comprehension_target_shadows_only_inside_the_scope() -> Result<()> {
    // x = 9
    // items = [x for x in x]
    let mut ast = Ast::new();
    let nine = ast.int(9);
    let outer_store = ast.name_store("x");
    let outer_assign = ast.assign(outer_store, nine);
    let x_elt = ast.name_load("x");
    let x_target = ast.name_store("x");
    let x_iter = ast.name_load("x");
    let comp = ast.list_comp(x_elt, vec![comprehension(x_target, x_iter, vec![])]);
    let items_store = ast.name_store("items");
    let items_assign = ast.assign(items_store, comp);
    ast.body = vec![outer_assign, items_assign];

    let model = analyze(&ast)?;
    let global_x = assignment_named(&model, ScopeId::global(), "x").context("global x")?;
    let comp_scope = model.scope_of(x_elt).context("comp scope")?;
    let comp_x = assignment_named(&model, comp_scope, "x").context("comp x")?;

    let iter_access = sole_access(&model, x_iter).context("iter access")?;
    let elt_access = sole_access(&model, x_elt).context("elt access")?;
    assert_eq!(model[iter_access].scope, ScopeId::global());
    assert_eq!(model[iter_access].assignments(), [global_x]);
    assert_eq!(model[elt_access].assignments(), [comp_x]);
    Ok(())
}

#[test]
fn qualified_names_follow_the_scope_chain() -> Result<()> {
    // def outer():
    //     def inner(p):
    //         return p
    let mut ast = Ast::new();
    let p_load = ast.name_load("p");
    let ret = ast.return_stmt(Some(p_load));
    let inner = ast.function_def("inner", parameters(&["p"]), vec![ret]);
    let outer = ast.function_def("outer", parameters(&[]), vec![inner]);
    ast.body = vec![outer];

    let model = analyze(&ast)?;
    assert_eq!(qualified(&model, outer), ["outer"]);
    assert_eq!(qualified(&model, inner), ["outer.<locals>.inner"]);
    assert_eq!(qualified(&model, p_load), ["outer.<locals>.inner.<locals>.p"]);
    let names = model.qualified_names_of(p_load);
    assert!(names[0].source.is_local());
    Ok(())
}

#[test]
fn qualified_names_for_classes_and_comprehensions() -> Result<()> {
    // class C:
    //     def method(self): pass
    // items = [x for x in data]
    let mut ast = Ast::new();
    let pass = ast.push_stmt(Stmt::Pass);
    let method = ast.function_def("method", parameters(&["self"]), vec![pass]);
    let class = ast.class_def("C", vec![], vec![method]);
    let x_elt = ast.name_load("x");
    let x_target = ast.name_store("x");
    let data_load = ast.name_load("data");
    let comp = ast.list_comp(x_elt, vec![comprehension(x_target, data_load, vec![])]);
    let items_store = ast.name_store("items");
    let items_assign = ast.assign(items_store, comp);
    ast.body = vec![class, items_assign];

    let model = analyze(&ast)?;
    assert_eq!(qualified(&model, method), ["C.method"]);
    assert_eq!(qualified(&model, x_elt), ["<comprehension>.x"]);
    Ok(())
}

#[test]
fn builtin_qualified_names() -> Result<()> {
    let mut ast = Ast::new();
    let print_load = ast.name_load("print");
    let call = ast.call(print_load, vec![]);
    let stmt = ast.expr_stmt(call);
    ast.body = vec![stmt];

    let model = analyze(&ast)?;
    let names = model.qualified_names_of(print_load);
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "builtins.print");
    assert_eq!(names[0].source, QualifiedNameSource::Builtin);

    // Read-only string query, without a node.
    let by_name = model.qualified_names_for_name(ScopeId::global(), "len");
    assert_eq!(by_name[0].name, "builtins.len");
    assert!(model
        .qualified_names_for_name(ScopeId::global(), "no_such_name")
        .is_empty());
    Ok(())
}

#[test]
fn dotted_access_is_reattributed_to_the_import() -> Result<()> {
    // import a.b
    // a.b.c()
    let mut ast = Ast::new();
    let import = ast.import(&[("a.b", None)]);
    let a_load = ast.name_load("a");
    let ab = ast.attribute(a_load, "b", Default::default());
    let abc = ast.attribute(ab, "c", Default::default());
    let call = ast.call(abc, vec![]);
    let stmt = ast.expr_stmt(call);
    ast.body = vec![import, stmt];

    let model = analyze(&ast)?;
    // Both `a.b` and `a` are bound by the import.
    let global = ScopeId::global();
    assert!(model[global].has("a.b"));
    assert!(model[global].has("a"));

    // The bare name access moved onto the `a.b` attribute node.
    assert!(model.accesses_of(a_load).is_empty());
    let access = sole_access(&model, ab).context("a.b access")?;
    assert_eq!(model[access].name(), "a.b");
    let assignment = model[access].assignments()[0];
    assert!(model[assignment].kind.is_import());

    assert_eq!(qualified(&model, abc), ["a.b.c"]);
    let sources = model.qualified_names_of(abc);
    assert_eq!(sources[0].source, QualifiedNameSource::Import);
    Ok(())
}

#[test]
fn aliased_import_rewrites_qualified_names() -> Result<()> {
    // import numpy as np
    // np.cos
    let mut ast = Ast::new();
    let import = ast.import(&[("numpy", Some("np"))]);
    let np_load = ast.name_load("np");
    let cos = ast.attribute(np_load, "cos", Default::default());
    let stmt = ast.expr_stmt(cos);
    ast.body = vec![import, stmt];

    let model = analyze(&ast)?;
    let access = sole_access(&model, np_load).context("np access")?;
    assert_eq!(model[access].name(), "np");
    assert_eq!(qualified(&model, cos), ["numpy.cos"]);
    assert_eq!(qualified(&model, np_load), ["numpy"]);
    Ok(())
}

#[test]
fn relative_from_import_keeps_leading_dots() -> Result<()> {
    // from ..pkg import mod
    // mod.f
    let mut ast = Ast::new();
    let import = ast.import_from(Some("pkg"), &[("mod", None)], 2);
    let mod_load = ast.name_load("mod");
    let f = ast.attribute(mod_load, "f", Default::default());
    let stmt = ast.expr_stmt(f);
    ast.body = vec![import, stmt];

    let model = analyze(&ast)?;
    assert_eq!(qualified(&model, f), ["..pkg.mod.f"]);
    Ok(())
}

#[test]
fn string_annotation_is_extracted_and_reattributed() -> Result<()> {
    // class MyClass: pass
    // def f(x: "MyClass"): return x
    let mut ast = Ast::new();
    let pass = ast.push_stmt(Stmt::Pass);
    let class = ast.class_def("MyClass", vec![], vec![pass]);
    let parsed = ast.name_load("MyClass");
    let literal = ast.string_annotation("MyClass", Some(parsed));
    let mut params = parameters(&["x"]);
    params.args[0].annotation = Some(literal);
    let x_load = ast.name_load("x");
    let ret = ast.return_stmt(Some(x_load));
    let def = ast.push_stmt(StmtFunctionDef {
        is_async: false,
        name: "f".into(),
        type_params: None,
        parameters: params,
        returns: None,
        body: vec![ret],
        decorator_list: Vec::new(),
    });
    ast.body = vec![class, def];

    let model = analyze(&ast)?;
    // The access is attributed to the string literal, not the inner name.
    assert!(model.accesses_of(parsed).is_empty());
    let access = sole_access(&model, literal).context("annotation access")?;
    assert!(model[access].is_annotation());
    assert_eq!(model[access].scope, ScopeId::global());

    let class_assignment =
        assignment_named(&model, ScopeId::global(), "MyClass").context("class binding")?;
    assert_eq!(model[access].assignments(), [class_assignment]);
    Ok(())
}

#[test]
fn malformed_string_annotation_is_swallowed() -> Result<()> {
    // x: "not ( valid" = 1
    let mut ast = Ast::new();
    let literal = ast.string_annotation("not ( valid", None);
    let x_store = ast.name_store("x");
    let one = ast.int(1);
    let stmt = ast.ann_assign(x_store, literal, Some(one));
    ast.body = vec![stmt];

    let model = analyze(&ast)?;
    assert!(model.accesses_of(literal).is_empty());
    assert!(model[ScopeId::global()].has("x"));
    Ok(())
}

#[test]
fn cast_first_argument_is_a_type_hint() -> Result<()> {
    // from typing import cast
    // class Widget: pass
    // w = cast("Widget", 1)
    let mut ast = Ast::new();
    let import = ast.import_from(Some("typing"), &[("cast", None)], 0);
    let pass = ast.push_stmt(Stmt::Pass);
    let class = ast.class_def("Widget", vec![], vec![pass]);
    let parsed = ast.name_load("Widget");
    let literal = ast.string_annotation("Widget", Some(parsed));
    let cast_load = ast.name_load("cast");
    let one = ast.int(1);
    let call = ast.call(cast_load, vec![literal, one]);
    let w_store = ast.name_store("w");
    let assign = ast.assign(w_store, call);
    ast.body = vec![import, class, assign];

    let model = analyze(&ast)?;
    let access = sole_access(&model, literal).context("hint access")?;
    assert!(model[access].is_type_hint());
    assert!(!model[access].is_annotation());
    let widget = assignment_named(&model, ScopeId::global(), "Widget").context("Widget")?;
    assert_eq!(model[access].assignments(), [widget]);

    let cast_access = sole_access(&model, cast_load).context("cast access")?;
    assert!(model[model[cast_access].assignments()[0]].kind.is_import());
    Ok(())
}

#[test]
fn new_type_arguments_after_the_first_are_hints() -> Result<()> {
    // from typing import NewType
    // UserId = NewType("UserId", int)
    let mut ast = Ast::new();
    let import = ast.import_from(Some("typing"), &[("NewType", None)], 0);
    let new_type = ast.name_load("NewType");
    let label = ast.string_literal("UserId");
    let int_load = ast.name_load("int");
    let call = ast.call(new_type, vec![label, int_load]);
    let target = ast.name_store("UserId");
    let assign = ast.assign(target, call);
    ast.body = vec![import, assign];

    let model = analyze(&ast)?;
    let access = sole_access(&model, int_load).context("int access")?;
    assert!(model[access].is_type_hint());
    assert!(model[model[access].assignments()[0]].kind.is_builtin());
    // The first argument is skipped entirely.
    assert_eq!(model.scope_of(label), None);
    Ok(())
}

#[test]
fn literal_subscript_exempts_strings() -> Result<()> {
    // from typing import Literal
    // x: Literal["on"] = 1
    let mut ast = Ast::new();
    let import = ast.import_from(Some("typing"), &[("Literal", None)], 0);
    let parsed = ast.name_load("on");
    let literal_string = ast.string_annotation("on", Some(parsed));
    let literal_load = ast.name_load("Literal");
    let annotation = ast.subscript(literal_load, literal_string);
    let x_store = ast.name_store("x");
    let one = ast.int(1);
    let stmt = ast.ann_assign(x_store, annotation, Some(one));
    ast.body = vec![import, stmt];

    let model = analyze(&ast)?;
    // The string stays a value: nothing is extracted from it.
    assert!(model.accesses_of(literal_string).is_empty());
    assert_eq!(model.scope_of(parsed), None);

    let literal_access = sole_access(&model, literal_load).context("Literal access")?;
    assert!(model[literal_access].is_annotation());
    assert!(model[literal_access].is_type_hint());
    Ok(())
}

#[test]
fn with_items_and_except_handlers_bind_names() -> Result<()> {
    // with open("f") as fh:
    //     fh.read()
    // try: pass
    // except ValueError as e:
    //     print(e)
    let mut ast = Ast::new();
    let open_load = ast.name_load("open");
    let path = ast.string_literal("f");
    let open_call = ast.call(open_load, vec![path]);
    let fh_store = ast.name_store("fh");
    let fh_load = ast.name_load("fh");
    let read = ast.attribute(fh_load, "read", Default::default());
    let read_call = ast.call(read, vec![]);
    let read_stmt = ast.expr_stmt(read_call);
    let with_stmt = ast.push_stmt(StmtWith {
        is_async: false,
        items: vec![WithItem {
            context_expr: open_call,
            optional_vars: Some(fh_store),
        }],
        body: vec![read_stmt],
    });

    let pass = ast.push_stmt(Stmt::Pass);
    let value_error = ast.name_load("ValueError");
    let e_store = ast.name_store("e");
    let print_load = ast.name_load("print");
    let e_load = ast.name_load("e");
    let print_call = ast.call(print_load, vec![e_load]);
    let print_stmt = ast.expr_stmt(print_call);
    let try_stmt = ast.push_stmt(StmtTry {
        body: vec![pass],
        handlers: vec![ExceptHandler {
            type_: Some(value_error),
            name: Some(e_store),
            body: vec![print_stmt],
        }],
        orelse: vec![],
        finalbody: vec![],
    });
    ast.body = vec![with_stmt, try_stmt];

    let model = analyze(&ast)?;
    let global = ScopeId::global();
    let fh = assignment_named(&model, global, "fh").context("fh binding")?;
    let fh_access = sole_access(&model, fh_load).context("fh access")?;
    assert_eq!(model[fh_access].assignments(), [fh]);

    let e = assignment_named(&model, global, "e").context("e binding")?;
    let e_access = sole_access(&model, e_load).context("e access")?;
    assert_eq!(model[e_access].assignments(), [e]);

    let ve_access = sole_access(&model, value_error).context("ValueError access")?;
    assert!(model[model[ve_access].assignments()[0]].kind.is_builtin());
    Ok(())
}

#[test]
fn walrus_and_del_and_aug_assign() -> Result<()> {
    // result = (n := 7)
    // print(n)
    // n += 1
    // del n
    let mut ast = Ast::new();
    let n_store = ast.name_store("n");
    let seven = ast.int(7);
    let named = ast.push_expr(ExprNamed {
        target: n_store,
        value: seven,
    });
    let result_store = ast.name_store("result");
    let assign = ast.assign(result_store, named);
    let print_load = ast.name_load("print");
    let n_load = ast.name_load("n");
    let print_call = ast.call(print_load, vec![n_load]);
    let print_stmt = ast.expr_stmt(print_call);
    let aug_target = ast.name_store("n");
    let one = ast.int(1);
    let aug = ast.push_stmt(StmtAugAssign {
        target: aug_target,
        op: Operator::Add,
        value: one,
    });
    let n_del = ast.name_del("n");
    let del = ast.push_stmt(StmtDelete {
        targets: vec![n_del],
    });
    ast.body = vec![assign, print_stmt, aug, del];

    let model = analyze(&ast)?;
    let global = ScopeId::global();
    assert_eq!(model[global].get("n").len(), 2);

    let walrus_binding = sole_access(&model, n_load)
        .map(|access| model[access].assignments().to_vec())
        .context("n access")?;
    assert_eq!(walrus_binding.len(), 1);

    // `del` reads the name like any other reference.
    let del_access = sole_access(&model, n_del).context("del access")?;
    assert_eq!(model[del_access].assignments().len(), 2);
    Ok(())
}

#[test]
fn lambda_parameters_and_defaults() -> Result<()> {
    // c = 1
    // f = lambda a=c: a
    let mut ast = Ast::new();
    let one = ast.int(1);
    let c_store = ast.name_store("c");
    let c_assign = ast.assign(c_store, one);
    let c_load = ast.name_load("c");
    let mut params = parameters(&["a"]);
    params.args[0].default = Some(c_load);
    let a_load = ast.name_load("a");
    let lambda = ast.lambda(params, a_load);
    let f_store = ast.name_store("f");
    let f_assign = ast.assign(f_store, lambda);
    ast.body = vec![c_assign, f_assign];

    let model = analyze(&ast)?;
    // Defaults evaluate in the enclosing scope.
    assert_eq!(model.scope_of(c_load), Some(ScopeId::global()));
    let c = assignment_named(&model, ScopeId::global(), "c").context("c binding")?;
    let c_access = sole_access(&model, c_load).context("c access")?;
    assert_eq!(model[c_access].assignments(), [c]);

    let lambda_scope = model.scope_of(a_load).context("lambda scope")?;
    assert!(model[lambda_scope].kind.is_function());
    assert_eq!(model[lambda_scope].name(), None);
    let a = assignment_named(&model, lambda_scope, "a").context("a binding")?;
    let a_access = sole_access(&model, a_load).context("a access")?;
    assert_eq!(model[a_access].assignments(), [a]);
    assert_eq!(qualified(&model, a_load), ["<locals>.a"]);
    Ok(())
}

#[test]
fn for_targets_are_visible_to_the_iterator() -> Result<()> {
    // x = [1]
    // for x in x: pass
    let mut ast = Ast::new();
    let one = ast.int(1);
    let outer_store = ast.name_store("x");
    let outer_assign = ast.assign(outer_store, one);
    let target = ast.name_store("x");
    let iter = ast.name_load("x");
    let pass = ast.push_stmt(Stmt::Pass);
    let for_stmt = ast.for_stmt(target, iter, vec![pass]);
    ast.body = vec![outer_assign, for_stmt];

    let model = analyze(&ast)?;
    // The loop target is bound before the iterator is evaluated, so the
    // iterator read links to both assignments of `x`.
    let access = sole_access(&model, iter).context("iter access")?;
    assert_eq!(model[access].assignments().len(), 2);
    Ok(())
}

#[test]
fn unresolved_names_still_record_accesses() -> Result<()> {
    let mut ast = Ast::new();
    let mystery = ast.name_load("mystery");
    let stmt = ast.expr_stmt(mystery);
    ast.body = vec![stmt];

    let model = analyze(&ast)?;
    let access = sole_access(&model, mystery).context("access")?;
    assert!(model[access].assignments().is_empty());
    assert_eq!(model[ScopeId::global()].accesses_named("mystery"), [access]);
    assert!(qualified(&model, mystery).is_empty());
    Ok(())
}

#[test]
fn analysis_is_deterministic() -> Result<()> {
    let mut ast = Ast::new();
    let one = ast.int(1);
    let x_store = ast.name_store("x");
    let assign = ast.assign(x_store, one);
    let x_load = ast.name_load("x");
    let ret = ast.return_stmt(Some(x_load));
    let def = ast.function_def("f", parameters(&["a", "b"]), vec![ret]);
    ast.body = vec![assign, def];

    let first = summarize(&analyze(&ast)?);
    let second = summarize(&analyze(&ast)?);
    assert_eq!(first, second);
    Ok(())
}

fn summarize(model: &SemanticModel<'_>) -> Vec<(ScopeKind, Vec<String>, Vec<String>)> {
    model
        .scope_ids()
        .map(|scope| {
            let mut assignments: Vec<String> = model
                .assignments_in(scope)
                .map(|id| format!("{}:{:?}", model[id].name, kind_tag(&model[id].kind)))
                .collect();
            assignments.sort();
            let mut accesses: Vec<String> = model
                .accesses_in(scope)
                .map(|id| model[id].name().to_string())
                .collect();
            accesses.sort();
            (model[scope].kind, assignments, accesses)
        })
        .collect()
}

fn kind_tag(kind: &AssignmentKind) -> &'static str {
    match kind {
        AssignmentKind::Plain { .. } => "plain",
        AssignmentKind::Import(_) => "import",
        AssignmentKind::Builtin => "builtin",
    }
}
