mod common;

use common::*;
use layer_generator::{
    expand_str,
    model::*,
    ExpandError,
    Expander,
    GenerateError,
    Template,
};

fn two_functions() -> ApiModel {
    ApiModel {
        functions: vec![
            function("vkA", "void", &[]),
            function("vkB", "VkResult", &["VkDevice device", "const char* pName"]),
        ],
        ..Default::default()
    }
}

#[test]
fn text_without_directives_round_trips() {
    let model = ApiModel::default();
    let text = "// generated\nint main() {{ return 0; }}\n";
    assert_eq!(
        expand_str(text, &model).unwrap(),
        "// generated\nint main() { return 0; }\n",
    );
    assert_eq!(expand_str("plain text\n", &model).unwrap(), "plain text\n");
}

#[test]
fn foreach_filters_functions() {
    let model = two_functions();
    let text = "@foreach function where('{funcName}' == 'vkA')\n{funcReturn} {funcName}();\n@end function\n";
    assert_eq!(expand_str(text, &model).unwrap(), "void vkA();\n");
}

#[test]
fn foreach_visits_in_declaration_order() {
    let model = two_functions();
    let text = "@foreach function\n{funcName}\n@end function\n";
    assert_eq!(expand_str(text, &model).unwrap(), "vkA\nvkB\n");
}

#[test]
fn function_prototypes() {
    let model = two_functions();
    let text = "@foreach function where({funcIsVoid} == False)\n{funcReturn} {funcName}({funcTypedParams}) {{ return next({funcNamedParams}); }}\n@end function\n";
    assert_eq!(
        expand_str(text, &model).unwrap(),
        "VkResult vkB(VkDevice device, const char* pName) { return next(device, pName); }\n",
    );
}

#[test]
fn nested_loops_see_outer_values() {
    let model = two_functions();
    let text = "\
@foreach function
@foreach parameter
{funcName}:{prmIndex}:{prmName}
@end parameter
@end function
";
    assert_eq!(expand_str(text, &model).unwrap(), "vkB:0:device\nvkB:1:pName\n");
}

#[test]
fn inner_item_wins_over_parent() {
    let mut model = ApiModel::default();
    model.structs.push(structure("VkOuter", &["uint32_t count", "float* pValues"]));
    let text = "\
@foreach struct
@foreach member where({memPtrLevel} > 0)
{sctName}.{memName}[{memIndex}]
@end member
@end struct
";
    assert_eq!(expand_str(text, &model).unwrap(), "VkOuter.pValues[1]\n");
}

#[test]
fn member_filter_sees_struct_fields() {
    let mut model = ApiModel::default();
    let mut viewport = structure(
        "VkPipelineViewportStateCreateInfo",
        &["uint32_t viewportCount", "const VkViewport* pViewports"],
    );
    viewport.inherited = vec![InheritedCondition {
        name: "is_dynamic_viewport".to_owned(),
        ty: "bool".to_owned(),
    }];
    model.structs.push(viewport);
    model.structs.push(structure("VkBufferCreateInfo", &["uint32_t size", "const uint32_t* pQueueFamilyIndices"]));
    let text = "\
@foreach struct
@foreach member where({sctHasInheritedState} and {memPtrLevel} > 0)
{sctName}.{memName}
@end member
@end struct
";
    assert_eq!(expand_str(text, &model).unwrap(), "VkPipelineViewportStateCreateInfo.pViewports\n");
}

#[test]
fn void_functions_end_to_end() {
    let model = ApiModel {
        functions: vec![function("vkA", "void", &[]), function("vkB", "int", &[])],
        ..Default::default()
    };
    let text = "@foreach function where('{funcReturn}' == 'void')\nvoid {funcName}();\n@end function";
    assert_eq!(expand_str(text, &model).unwrap(), "void vkA();\n");
}

#[test]
fn if_blocks_use_enclosing_scope() {
    let model = two_functions();
    let text = "\
@foreach function
@if({funcIsVoid})
    {funcName}();
@end if
@if('{funcReturn}' == 'VkResult')
    return {funcName}();
@end if
@end function
";
    assert_eq!(
        expand_str(text, &model).unwrap(),
        "    vkA();\n    return vkB();\n",
    );
}

#[test]
fn inline_markers_expand_in_place() {
    let model = two_functions();
    let text = "names: @foreach function {funcName} @end function.\n";
    assert_eq!(expand_str(text, &model).unwrap(), "names:  vkA  vkB .\n");
}

#[test]
fn guarded_items_are_wrapped() {
    let mut model = two_functions();
    add_extension(&mut model, extension("VK_KHR_b", Some("VK_USE_PLATFORM_B"), &["vkB"]));
    let text = "@foreach function\n{funcName}\n@end function\n";
    assert_eq!(
        expand_str(text, &model).unwrap(),
        "vkA\n#if defined(VK_USE_PLATFORM_B)\nvkB\n#endif // VK_USE_PLATFORM_B\n",
    );
}

#[test]
fn unguarded_extension_items_are_not_wrapped() {
    let mut model = two_functions();
    add_extension(&mut model, extension("VK_KHR_b", None, &["vkB"]));
    let text = "@foreach function\n{funcName}\n@end function\n";
    assert_eq!(expand_str(text, &model).unwrap(), "vkA\nvkB\n");
}

#[test]
fn system_types_are_guarded_by_their_extension() {
    let mut model = ApiModel::default();
    add_extension(&mut model, extension("VK_KHR_xlib_surface", Some("VK_USE_PLATFORM_XLIB_KHR"), &[]));
    model.system_types.push(SystemType {
        name: "Display".to_owned(),
        extension: "VK_KHR_xlib_surface".to_owned(),
        guard: Some("VK_USE_PLATFORM_XLIB_KHR".to_owned()),
    });
    let text = "@foreach systype\nstruct {sysName};\n@end systype\n";
    assert_eq!(
        expand_str(text, &model).unwrap(),
        "#if defined(VK_USE_PLATFORM_XLIB_KHR)\nstruct Display;\n#endif // VK_USE_PLATFORM_XLIB_KHR\n",
    );
}

#[test]
fn options_follow_their_enum() {
    let model = ApiModel {
        enums: vec![Enum {
            name: "VkFoo".to_owned(),
            options: vec![
                EnumOption {
                    name: "VK_FOO_A".to_owned(),
                    value: "0".to_owned(),
                    multi_value: false,
                    is_alias: false,
                },
                EnumOption {
                    name: "VK_FOO_B".to_owned(),
                    value: "1".to_owned(),
                    multi_value: false,
                    is_alias: false,
                },
            ],
        }],
        ..Default::default()
    };
    let text = "@foreach enum\n@foreach option\n{enumName}::{optName} = {optValue}\n@end option\n@end enum\n";
    assert_eq!(
        expand_str(text, &model).unwrap(),
        "VkFoo::VK_FOO_A = 0\nVkFoo::VK_FOO_B = 1\n",
    );
}

#[test]
fn empty_collections_emit_nothing() {
    let model = ApiModel::default();
    let text = "begin\n@foreach struct\n{sctName}\n@end struct\nend\n";
    assert_eq!(expand_str(text, &model).unwrap(), "begin\nend\n");
}

#[test]
fn unbound_placeholder_is_fatal() {
    let model = two_functions();
    let text = "@foreach function\n{memName}\n@end function\n";
    match expand_str(text, &model) {
        Err(GenerateError::Expand(ExpandError::Unbound { name, line })) => {
            assert_eq!(name, "memName");
            assert_eq!(line, 2);
        },
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn unbound_placeholder_in_condition_is_fatal() {
    let model = two_functions();
    let text = "@foreach function where({sctName} == 'x')\n{funcName}\n@end function\n";
    assert!(matches!(
        expand_str(text, &model),
        Err(GenerateError::Expand(ExpandError::Unbound { name, .. })) if name == "sctName"
    ));
}

#[test]
fn scoped_loop_without_owner_is_fatal() {
    let model = two_functions();
    let text = "@foreach member\n{memName}\n@end member\n";
    assert!(matches!(
        expand_str(text, &model),
        Err(GenerateError::Expand(ExpandError::MissingOwner { kind: EntityKind::Member, .. }))
    ));
}

#[test]
fn non_boolean_condition_is_fatal() {
    let model = two_functions();
    let text = "@foreach function where('{funcName}')\n{funcName}\n@end function\n";
    assert!(matches!(
        expand_str(text, &model),
        Err(GenerateError::Expand(ExpandError::Condition { .. }))
    ));
}

#[test]
fn stray_brace_is_fatal() {
    let model = ApiModel::default();
    assert!(matches!(
        expand_str("int x = 0; }\n", &model),
        Err(GenerateError::Expand(ExpandError::Format { .. }))
    ));
}

#[test]
fn profiling_counts_visits_and_emits() {
    let model = two_functions();
    let text = "@foreach function where({funcIsVoid})\n{funcName}\n@end function\n";
    let template = Template::parse(text).unwrap();
    let mut expander = Expander::new(&model).with_profiling();
    assert_eq!(expander.expand_template(&template).unwrap(), "vkA\n");
    let stats = expander.stats().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].line, 1);
    assert_eq!(stats[0].visited, 2);
    assert_eq!(stats[0].emitted, 1);
}

#[test]
fn profiling_is_off_by_default() {
    let model = two_functions();
    let template = Template::parse("@foreach function\n@end function\n").unwrap();
    let mut expander = Expander::new(&model);
    expander.expand_template(&template).unwrap();
    assert!(expander.stats().is_none());
}
