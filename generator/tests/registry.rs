use layer_generator::{
    build_model,
    config::Selection,
    model::*,
    validate_model,
    ApiModel,
    Vulkan,
};

const REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<registry>
    <types>
        <type category="include" name="vk_platform">#include "vk_platform.h"</type>
        <type category="include" name="X11/Xlib.h">#include &lt;X11/Xlib.h&gt;</type>
        <type requires="X11/Xlib.h" name="Display"/>
        <type requires="vk_platform" name="uint32_t"/>
        <type requires="vk_platform" name="char"/>
        <type requires="vk_platform" name="void"/>
        <type requires="vk_platform" name="float"/>
        <type category="basetype">typedef <type>uint32_t</type> <name>VkFlags</name>;</type>
        <type category="basetype">typedef <type>uint32_t</type> <name>VkBool32</name>;</type>
        <type category="handle" objtypeenum="VK_OBJECT_TYPE_INSTANCE"><type>VK_DEFINE_HANDLE</type>(<name>VkInstance</name>)</type>
        <type category="handle" parent="VkInstance" objtypeenum="VK_OBJECT_TYPE_PHYSICAL_DEVICE"><type>VK_DEFINE_HANDLE</type>(<name>VkPhysicalDevice</name>)</type>
        <type category="handle" parent="VkPhysicalDevice" objtypeenum="VK_OBJECT_TYPE_DEVICE"><type>VK_DEFINE_HANDLE</type>(<name>VkDevice</name>)</type>
        <type category="handle" parent="VkDevice" objtypeenum="VK_OBJECT_TYPE_FENCE"><type>VK_DEFINE_NON_DISPATCHABLE_HANDLE</type>(<name>VkFence</name>)</type>
        <type category="handle" parent="VkInstance" objtypeenum="VK_OBJECT_TYPE_SURFACE_KHR"><type>VK_DEFINE_NON_DISPATCHABLE_HANDLE</type>(<name>VkSurfaceKHR</name>)</type>
        <type name="VkStructureType" category="enum"/>
        <type name="VkResult" category="enum"/>
        <type name="VkFenceCreateFlagBits" category="enum"/>
        <type requires="VkFenceCreateFlagBits" category="bitmask">typedef <type>VkFlags</type> <name>VkFenceCreateFlags</name>;</type>
        <type category="bitmask">typedef <type>VkFlags</type> <name>VkXlibSurfaceCreateFlagsKHR</name>;</type>
        <type category="funcpointer">typedef void (VKAPI_PTR *<name>PFN_vkVoidFunction</name>)(void);</type>
        <type category="struct" name="VkFenceCreateInfo">
            <member values="VK_STRUCTURE_TYPE_FENCE_CREATE_INFO"><type>VkStructureType</type> <name>sType</name></member>
            <member optional="true">const <type>void</type>* <name>pNext</name></member>
            <member optional="true"><type>VkFenceCreateFlags</type> <name>flags</name></member>
        </type>
        <type category="struct" name="VkViewportList">
            <member><type>uint32_t</type> <name>count</name></member>
            <member len="count">const <type>float</type>* <name>pValues</name></member>
            <member><type>char</type> <name>label</name>[<enum>VK_MAX_LABEL_SIZE</enum>]</member>
        </type>
        <type category="struct" name="VkXlibSurfaceCreateInfoKHR">
            <member values="VK_STRUCTURE_TYPE_XLIB_SURFACE_CREATE_INFO_KHR"><type>VkStructureType</type> <name>sType</name></member>
            <member optional="true">const <type>void</type>* <name>pNext</name></member>
            <member optional="true"><type>VkXlibSurfaceCreateFlagsKHR</type> <name>flags</name></member>
            <member><type>Display</type>* <name>dpy</name></member>
        </type>
        <type category="struct" name="VkUnusedInfo">
            <member><type>uint32_t</type> <name>unused</name></member>
        </type>
        <type category="struct" name="VkFenceCreateInfoKHR" alias="VkFenceCreateInfo"/>
    </types>
    <enums name="API Constants">
        <enum type="uint32_t" value="256" name="VK_MAX_LABEL_SIZE"/>
        <enum type="float" value="1000.0F" name="VK_LOD_CLAMP_NONE"/>
    </enums>
    <enums name="VkStructureType" type="enum">
        <enum value="8" name="VK_STRUCTURE_TYPE_FENCE_CREATE_INFO"/>
    </enums>
    <enums name="VkResult" type="enum">
        <enum value="0" name="VK_SUCCESS"/>
        <enum value="-1" name="VK_ERROR_OUT_OF_HOST_MEMORY"/>
    </enums>
    <enums name="VkFenceCreateFlagBits" type="bitmask">
        <enum bitpos="0" name="VK_FENCE_CREATE_SIGNALED_BIT"/>
    </enums>
    <commands>
        <command>
            <proto><type>VkResult</type> <name>vkCreateInstance</name></proto>
            <param optional="true">const <type>void</type>* <name>pCreateInfo</name></param>
            <param><type>VkInstance</type>* <name>pInstance</name></param>
        </command>
        <command>
            <proto><type>VkResult</type> <name>vkEnumerateInstanceVersion</name></proto>
            <param><type>uint32_t</type>* <name>pApiVersion</name></param>
        </command>
        <command>
            <proto><type>void</type> <name>vkGetPhysicalDeviceThing</name></proto>
            <param><type>VkPhysicalDevice</type> <name>physicalDevice</name></param>
            <param><type>VkViewportList</type>* <name>pList</name></param>
        </command>
        <command>
            <proto><type>VkResult</type> <name>vkCreateFence</name></proto>
            <param><type>VkDevice</type> <name>device</name></param>
            <param>const <type>VkFenceCreateInfo</type>* <name>pCreateInfo</name></param>
            <param><type>VkFence</type>* <name>pFence</name></param>
        </command>
        <command>
            <proto><type>VkResult</type> <name>vkCreateXlibSurfaceKHR</name></proto>
            <param><type>VkInstance</type> <name>instance</name></param>
            <param>const <type>VkXlibSurfaceCreateInfoKHR</type>* <name>pCreateInfo</name></param>
            <param><type>VkSurfaceKHR</type>* <name>pSurface</name></param>
        </command>
        <command>
            <proto><type>void</type> <name>vkUnused</name></proto>
            <param><type>VkUnusedInfo</type>* <name>pInfo</name></param>
        </command>
        <command name="vkCreateFenceKHR" alias="vkCreateFence"/>
    </commands>
    <feature api="vulkan" name="VK_VERSION_1_0" number="1.0">
        <require>
            <type name="VkResult"/>
            <command name="vkCreateInstance"/>
            <command name="vkEnumerateInstanceVersion"/>
            <command name="vkGetPhysicalDeviceThing"/>
            <command name="vkCreateFence"/>
        </require>
    </feature>
    <extensions>
        <extension name="VK_KHR_xlib_surface" number="5" type="instance" supported="vulkan" protect="VK_USE_PLATFORM_XLIB_KHR">
            <require>
                <enum offset="0" extends="VkStructureType" name="VK_STRUCTURE_TYPE_XLIB_SURFACE_CREATE_INFO_KHR"/>
                <type name="VkXlibSurfaceCreateFlagsKHR"/>
                <type name="VkXlibSurfaceCreateInfoKHR"/>
                <command name="vkCreateXlibSurfaceKHR"/>
            </require>
        </extension>
        <extension name="VK_KHR_fence_alias" number="7" type="device" supported="vulkan">
            <require>
                <enum bitpos="3" extends="VkFenceCreateFlagBits" name="VK_FENCE_CREATE_EXTRA_BIT_KHR"/>
                <enum offset="1" dir="-" extends="VkResult" name="VK_ERROR_FENCE_KHR"/>
                <type name="VkFenceCreateInfoKHR"/>
                <command name="vkCreateFenceKHR"/>
            </require>
        </extension>
        <extension name="VK_EXT_disabled" number="9" type="device" supported="disabled">
            <require>
                <command name="vkUnused"/>
            </require>
        </extension>
    </extensions>
</registry>
"#;

fn registry() -> vk_parse::Registry {
    let (registry, _warnings) = vk_parse::parse_stream(REGISTRY.as_bytes()).unwrap();
    registry
}

fn model_with(selection: &Selection) -> ApiModel {
    build_model::<Vulkan>(&registry(), selection).unwrap()
}

fn model() -> ApiModel {
    model_with(&Selection::default())
}

fn names<T, F: Fn(&T) -> &str>(items: &[T], f: F) -> Vec<&str> {
    items.iter().map(f).collect()
}

#[test]
fn required_commands_in_declaration_order() {
    let model = model();
    assert_eq!(
        names(&model.functions, |f| &f.name),
        vec!["vkCreateInstance", "vkGetPhysicalDeviceThing", "vkCreateFence", "vkCreateXlibSurfaceKHR", "vkCreateFenceKHR"],
    );
}

#[test]
fn excluded_and_disabled_commands_are_skipped() {
    let model = model();
    assert!(model.function("vkEnumerateInstanceVersion").is_none());
    assert!(model.function("vkUnused").is_none());
    assert!(model.structure("VkUnusedInfo").is_none());
    assert!(model.extensions.iter().all(|ext| ext.name != "VK_EXT_disabled"));
}

#[test]
fn dispatch_types() {
    let model = model();
    let dispatch = |name: &str| model.function(name).unwrap().dispatch;
    assert_eq!(dispatch("vkCreateInstance"), DispatchType::Instance);
    assert_eq!(dispatch("vkGetPhysicalDeviceThing"), DispatchType::Instance);
    assert_eq!(dispatch("vkCreateFence"), DispatchType::Device);
    assert_eq!(dispatch("vkCreateXlibSurfaceKHR"), DispatchType::Instance);

    let surface = model.function("vkCreateXlibSurfaceKHR").unwrap();
    assert_eq!(surface.function_type(), "instance");
    assert_eq!(model.function("vkCreateFence").unwrap().function_type(), "device");
}

#[test]
fn command_signatures() {
    let model = model();
    let f = model.function("vkCreateFence").unwrap();
    assert_eq!(f.return_type, "VkResult");
    assert_eq!(
        f.typed_params(),
        "VkDevice device, const VkFenceCreateInfo* pCreateInfo, VkFence* pFence",
    );
    let create = model.function("vkCreateInstance").unwrap();
    assert!(create.parameters[0].decl.optional);
    assert!(!create.parameters[1].decl.optional);
}

#[test]
fn command_aliases_copy_their_target() {
    let model = model();
    let alias = model.function("vkCreateFenceKHR").unwrap();
    assert_eq!(alias.alias_of.as_deref(), Some("vkCreateFence"));
    assert_eq!(alias.parameters.len(), 3);
    assert_eq!(model.canonical_name("vkCreateFenceKHR"), "vkCreateFence");
}

#[test]
fn type_closure_pulls_in_dependencies() {
    let model = model();
    // Only reachable through vkGetPhysicalDeviceThing's parameter.
    assert!(model.structure("VkViewportList").is_some());
    // Reachable through VkFenceCreateInfo::flags.
    assert!(model.flags.iter().any(|f| f.name == "VkFenceCreateFlags"));
    assert!(model.bitmasks.iter().any(|b| b.name == "VkFenceCreateFlagBits"));
    assert!(model.handles.iter().any(|h| h.name == "VkFence"));
}

#[test]
fn struct_members() {
    let model = model();
    let s = model.structure("VkFenceCreateInfo").unwrap();
    assert_eq!(s.structure_type.as_deref(), Some("VK_STRUCTURE_TYPE_FENCE_CREATE_INFO"));
    assert_eq!(
        s.members.iter().map(|m| m.decl.name.as_str()).collect::<Vec<_>>(),
        vec!["sType", "pNext", "flags"],
    );
    assert!(s.members[1].decl.optional);

    let list = model.structure("VkViewportList").unwrap();
    let values = &list.members[1];
    assert_eq!(values.decl.length.as_deref(), Some("count"));
    assert!(values.length_is_member);
    assert_eq!(list.members[2].decl.array_lengths, vec!["VK_MAX_LABEL_SIZE"]);
    assert_eq!(model.constant("VK_MAX_LABEL_SIZE"), Some("256"));
}

#[test]
fn struct_aliases_are_recorded_not_duplicated() {
    let model = model();
    assert_eq!(model.structs.iter().filter(|s| s.name.starts_with("VkFenceCreateInfo")).count(), 1);
    assert_eq!(model.canonical_name("VkFenceCreateInfoKHR"), "VkFenceCreateInfo");
}

#[test]
fn handles() {
    let model = model();
    let handle = |name: &str| model.handles.iter().find(|h| h.name == name).unwrap();
    assert!(handle("VkDevice").dispatchable);
    assert!(!handle("VkFence").dispatchable);
    assert_eq!(handle("VkFence").parent.as_deref(), Some("VkDevice"));
    assert_eq!(handle("VkPhysicalDevice").object_type, "VK_OBJECT_TYPE_PHYSICAL_DEVICE");
}

#[test]
fn enums_include_extension_values() {
    let model = model();
    let result = model.enums.iter().find(|e| e.name == "VkResult").unwrap();
    let error = result.options.iter().find(|o| o.name == "VK_ERROR_FENCE_KHR").unwrap();
    assert_eq!(error.value, "-1000006001");

    let structure_type = model.enums.iter().find(|e| e.name == "VkStructureType").unwrap();
    let xlib = structure_type.options.iter()
        .find(|o| o.name == "VK_STRUCTURE_TYPE_XLIB_SURFACE_CREATE_INFO_KHR")
        .unwrap();
    assert_eq!(xlib.value, "1000004000");

    let bits = model.bitmasks.iter().find(|b| b.name == "VkFenceCreateFlagBits").unwrap();
    assert_eq!(bits.width, 32);
    assert_eq!(
        bits.options.iter().map(|o| (o.name.as_str(), o.value.as_str())).collect::<Vec<_>>(),
        vec![("VK_FENCE_CREATE_SIGNALED_BIT", "0x00000001"), ("VK_FENCE_CREATE_EXTRA_BIT_KHR", "0x00000008")],
    );
}

#[test]
fn extensions_and_guards() {
    let model = model();
    assert_eq!(names(&model.extensions, |e| &e.name), vec!["VK_KHR_xlib_surface", "VK_KHR_fence_alias"]);
    let xlib = &model.extensions[0];
    assert_eq!(xlib.guard.as_deref(), Some("VK_USE_PLATFORM_XLIB_KHR"));
    assert_eq!(xlib.ext_type, "instance");
    assert_eq!(xlib.number, 5);

    let f = model.function("vkCreateXlibSurfaceKHR").unwrap();
    let ext = model.extension_for(&Item::Function(f)).unwrap();
    assert_eq!(ext.name, "VK_KHR_xlib_surface");
    let s = model.structure("VkXlibSurfaceCreateInfoKHR").unwrap();
    assert_eq!(model.extension_for(&Item::Struct(s)).map(|e| e.name.as_str()), Some("VK_KHR_xlib_surface"));
    let core = model.function("vkCreateFence").unwrap();
    assert!(model.extension_for(&Item::Function(core)).is_none());
}

#[test]
fn system_types_come_from_extension_structs() {
    let model = model();
    assert_eq!(
        model.system_types,
        vec![SystemType {
            name: "Display".to_owned(),
            extension: "VK_KHR_xlib_surface".to_owned(),
            guard: Some("VK_USE_PLATFORM_XLIB_KHR".to_owned()),
        }],
    );
}

#[test]
fn system_types_ignore_deep_pointers() {
    let xml = REGISTRY.replace(
        "<type>Display</type>* <name>dpy</name>",
        "<type>Display</type>** <name>ppDpy</name>",
    );
    let (registry, _warnings) = vk_parse::parse_stream(xml.as_bytes()).unwrap();
    let model = build_model::<Vulkan>(&registry, &Selection::default()).unwrap();
    let member = model.structure("VkXlibSurfaceCreateInfoKHR").unwrap()
        .members
        .iter()
        .find(|m| m.decl.name == "ppDpy")
        .unwrap();
    assert_eq!(member.decl.pointer_level, 2);
    assert!(model.system_types.is_empty());
}

#[test]
fn platform_types_are_external() {
    let model = model();
    let external: Vec<_> = names(&model.external_types, |t| &t.name);
    assert!(external.contains(&"uint32_t"));
    assert!(!external.contains(&"Display"));
}

#[test]
fn removed_extensions_are_left_out() {
    let selection = Selection::from_lists(Some("vulkan"), &[], &[], &["VK_KHR_xlib_surface"], &[]).unwrap();
    let model = model_with(&selection);
    assert!(model.function("vkCreateXlibSurfaceKHR").is_none());
    assert!(model.structure("VkXlibSurfaceCreateInfoKHR").is_none());
    assert!(model.system_types.is_empty());
    assert_eq!(names(&model.extensions, |e| &e.name), vec!["VK_KHR_fence_alias"]);
}

#[test]
fn no_default_extensions() {
    let selection = Selection::from_lists::<&str>(None, &[], &[], &[], &[]).unwrap();
    let model = model_with(&selection);
    assert!(model.extensions.is_empty());
    assert!(model.function("vkCreateFence").is_some());
    assert!(model.function("vkCreateFenceKHR").is_none());
}

#[test]
fn feature_patterns_restrict_core() {
    let selection = Selection::from_lists::<&str>(None, &["VK_VERSION_2_0"], &[], &[], &[]).unwrap();
    let model = model_with(&selection);
    assert!(model.functions.is_empty());
}

#[test]
fn model_validates() {
    let model = model();
    assert_eq!(validate_model(&model), Vec::<String>::new());
}
