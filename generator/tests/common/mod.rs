#![allow(dead_code)]

use layer_generator::{
    cdecl,
    model::*,
};

pub fn decl(code: &str) -> Declaration {
    cdecl::declaration(code).unwrap()
}

pub fn function(name: &str, return_type: &str, params: &[&str]) -> Function {
    Function {
        name: name.to_owned(),
        return_type: return_type.to_owned(),
        parameters: params.iter()
            .enumerate()
            .map(|(index, code)| Parameter {
                decl: decl(code),
                index,
                inherited_conditions: String::new(),
            })
            .collect(),
        dispatch: DispatchType::Device,
        extension_type: None,
        alias_of: None,
        tracked_state: None,
    }
}

pub fn structure(name: &str, members: &[&str]) -> Struct {
    Struct {
        name: name.to_owned(),
        members: members.iter()
            .enumerate()
            .map(|(index, code)| Member {
                decl: decl(code),
                index,
                length_is_member: false,
                condition: None,
                inherited_conditions: String::new(),
            })
            .collect(),
        structure_type: None,
        extends: Vec::new(),
        returned_only: false,
        inherited: Vec::new(),
    }
}

pub fn extension(name: &str, guard: Option<&str>, commands: &[&str]) -> Extension {
    Extension {
        name: name.to_owned(),
        ext_type: "device".to_owned(),
        number: 1,
        guard: guard.map(str::to_owned),
        types: Default::default(),
        commands: commands.iter().map(|&c| c.to_owned()).collect(),
    }
}

/// Registers `ext` and maps its commands to it.
pub fn add_extension(model: &mut ApiModel, ext: Extension) {
    let index = model.extensions.len();
    for command in &ext.commands {
        model.command_extensions.insert(command.clone(), index);
    }
    for ty in &ext.types {
        model.type_extensions.insert(ty.clone(), index);
    }
    model.extensions.push(ext);
}
