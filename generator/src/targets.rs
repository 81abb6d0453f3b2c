/// A registered output file and the template that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub name: &'static str,
    pub filename: &'static str,
    pub template: &'static str,
    /// Gets an `#ifndef` re-inclusion guard when protection is on.
    pub header: bool,
}

impl Target {
    /// `vk_struct_member.h` -> `VK_STRUCT_MEMBER_H_`
    pub fn include_guard(&self) -> String {
        let mut guard: String = self.filename.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        guard.push('_');
        guard
    }
}

pub const TARGETS: &[Target] = &[
    Target {
        name: "api_cost.cpp",
        filename: "api_cost.cpp",
        template: include_str!("../templates/api_cost.cpp.in"),
        header: false,
    },
    Target {
        name: "vktrace_systrace.cpp",
        filename: "vktrace_systrace.cpp",
        template: include_str!("../templates/vktrace_systrace.cpp.in"),
        header: false,
    },
    Target {
        name: "vktrace_emptydriver.cpp",
        filename: "vktrace_emptydriver.cpp",
        template: include_str!("../templates/vktrace_emptydriver.cpp.in"),
        header: false,
    },
    Target {
        name: "vk_struct_member.h",
        filename: "vk_struct_member.h",
        template: include_str!("../templates/vk_struct_member.h.in"),
        header: true,
    },
];

pub fn find(name: &str) -> Option<&'static Target> {
    TARGETS.iter().find(|t| t.name == name)
}

pub fn names() -> impl Iterator<Item=&'static str> {
    TARGETS.iter().map(|t| t.name)
}
