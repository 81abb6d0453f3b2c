use crate::config::*;

#[derive(Debug, Clone, Copy)]
pub struct Vulkan;

impl Vulkan {
    const DYNAMIC_VIEWPORT: &'static str = "object.pDynamicState && \
        std::count(object.pDynamicState->pDynamicStates, \
        object.pDynamicState->pDynamicStates + object.pDynamicState->dynamicStateCount, \
        VK_DYNAMIC_STATE_VIEWPORT)";
    const DYNAMIC_SCISSOR: &'static str = "object.pDynamicState && \
        std::count(object.pDynamicState->pDynamicStates, \
        object.pDynamicState->pDynamicStates + object.pDynamicState->dynamicStateCount, \
        VK_DYNAMIC_STATE_SCISSOR)";
    const IMAGE_DESCRIPTORS: &'static str = "(object.descriptorType == VK_DESCRIPTOR_TYPE_SAMPLER) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_SAMPLED_IMAGE) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_STORAGE_IMAGE) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_INPUT_ATTACHMENT)";
    const BUFFER_DESCRIPTORS: &'static str = "(object.descriptorType == VK_DESCRIPTOR_TYPE_STORAGE_BUFFER) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_UNIFORM_BUFFER) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_UNIFORM_BUFFER_DYNAMIC) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_STORAGE_BUFFER_DYNAMIC)";
    const TEXEL_DESCRIPTORS: &'static str = "(object.descriptorType == VK_DESCRIPTOR_TYPE_UNIFORM_TEXEL_BUFFER) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_STORAGE_TEXEL_BUFFER)";
    const SAMPLER_DESCRIPTORS: &'static str = "(object.descriptorType == VK_DESCRIPTOR_TYPE_SAMPLER) || \
        (object.descriptorType == VK_DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER)";
}

impl ApiConfig for Vulkan {
    const NAME: &'static str = "vulkan";
    const REGISTRY_FILENAME: &'static str = "vk.xml";
    const TYPE_PREFIX: &'static str = "Vk";
    const CONSTANTS_BLOCK: &'static str = "API Constants";
    const PLATFORM_HEADER: &'static str = "vk_platform";
    const OBJECT_TYPE_PREFIX: &'static str = "VK_OBJECT_TYPE_";
    const TAGGED_STRUCT: StructConfig<'static> = StructConfig {
        ty_name: "sType",
    };
    const DISPATCH: DispatchConfig<'static> = DispatchConfig {
        instance_fns: &[
            "vkCreateInstance",
        ],
        instance_types: &[
            "VkInstance",
            "VkPhysicalDevice",
        ],
    };
    const EXCLUDED_COMMANDS: &'static [&'static str] = &[
        "vkEnumerateInstanceVersion",
    ];
    const DEFINE_TYPES: &'static [&'static str] = &[
        "ANativeWindow",
        "AHardwareBuffer",
    ];
    const INHERITED_STATE: &'static [InheritedState<'static>] = &[
        InheritedState {
            structure: "VkPipelineViewportStateCreateInfo",
            source: "VkGraphicsPipelineCreateInfo",
            vars: &[
                InheritedVar {
                    name: "is_dynamic_viewport",
                    ty: "bool",
                    expr: Self::DYNAMIC_VIEWPORT,
                },
                InheritedVar {
                    name: "is_dynamic_scissor",
                    ty: "bool",
                    expr: Self::DYNAMIC_SCISSOR,
                },
            ],
        },
        InheritedState {
            structure: "VkCommandBufferBeginInfo",
            source: "vkBeginCommandBuffer",
            vars: &[
                InheritedVar {
                    name: "cmd_buffer",
                    ty: "VkCommandBuffer",
                    expr: "commandBuffer",
                },
            ],
        },
    ];
    const VALIDITY_CHECKS: &'static [ValidityCheck<'static>] = &[
        ValidityCheck {
            structure: "VkBufferCreateInfo",
            member: "pQueueFamilyIndices",
            condition: "object.sharingMode == VK_SHARING_MODE_CONCURRENT",
        },
        ValidityCheck {
            structure: "VkCommandBufferBeginInfo",
            member: "pInheritanceInfo",
            condition: "ApiDumpInstance::current().getCmdBufferLevel(cmd_buffer) == VK_COMMAND_BUFFER_LEVEL_SECONDARY",
        },
        ValidityCheck {
            structure: "VkDescriptorSetLayoutBinding",
            member: "pImmutableSamplers",
            condition: Self::SAMPLER_DESCRIPTORS,
        },
        ValidityCheck {
            structure: "VkImageCreateInfo",
            member: "pQueueFamilyIndices",
            condition: "object.sharingMode == VK_SHARING_MODE_CONCURRENT",
        },
        ValidityCheck {
            structure: "VkPipelineViewportStateCreateInfo",
            member: "pViewports",
            condition: "!is_dynamic_viewport",
        },
        ValidityCheck {
            structure: "VkPipelineViewportStateCreateInfo",
            member: "pScissors",
            condition: "!is_dynamic_scissor",
        },
        ValidityCheck {
            structure: "VkSwapchainCreateInfoKHR",
            member: "pQueueFamilyIndices",
            condition: "object.imageSharingMode == VK_SHARING_MODE_CONCURRENT",
        },
        ValidityCheck {
            structure: "VkWriteDescriptorSet",
            member: "pImageInfo",
            condition: Self::IMAGE_DESCRIPTORS,
        },
        ValidityCheck {
            structure: "VkWriteDescriptorSet",
            member: "pBufferInfo",
            condition: Self::BUFFER_DESCRIPTORS,
        },
        ValidityCheck {
            structure: "VkWriteDescriptorSet",
            member: "pTexelBufferView",
            condition: Self::TEXEL_DESCRIPTORS,
        },
    ];
    const TRACKED_STATE: &'static [(&'static str, &'static str)] = &[
        (
            "vkAllocateCommandBuffers",
            "if(result == VK_SUCCESS)\n\
             ApiDumpInstance::current().addCmdBuffers(\n\
             device,\n\
             pAllocateInfo->commandPool,\n\
             std::vector<VkCommandBuffer>(pCommandBuffers, pCommandBuffers + pAllocateInfo->commandBufferCount),\n\
             pAllocateInfo->level\n\
             );",
        ),
        (
            "vkDestroyCommandPool",
            "ApiDumpInstance::current().eraseCmdBufferPool(device, commandPool);",
        ),
        (
            "vkFreeCommandBuffers",
            "ApiDumpInstance::current().eraseCmdBuffers(device, commandPool, \
             std::vector<VkCommandBuffer>(pCommandBuffers, pCommandBuffers + commandBufferCount));",
        ),
    ];
}
