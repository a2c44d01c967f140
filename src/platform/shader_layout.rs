use std::sync::OnceLock;

use regex::Regex;

use super::interfaces::BindingLayout;

fn block_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment pattern"))
}

fn line_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//[^\n]*").expect("valid line comment pattern"))
}

fn binding_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@group\s*\(\s*(\d+)\s*\)\s*@binding\s*\(\s*(\d+)\s*\)")
            .expect("valid binding pattern")
    })
}

/// `(group, binding)` pairs declared by a WGSL module, ignoring commented-out code.
pub(crate) fn declared_bindings(source: &str) -> Vec<(u32, u32)> {
    let no_block = block_comment().replace_all(source, "");
    let stripped = line_comment().replace_all(&no_block, "");

    binding_attribute()
        .captures_iter(&stripped)
        .filter_map(|captures| {
            let group = captures.get(1)?.as_str().parse().ok()?;
            let binding = captures.get(2)?.as_str().parse().ok()?;
            Some((group, binding))
        })
        .collect()
}

/// Checks every declared binding against the group convention of [`BindingLayout`].
pub(crate) fn validate_bindings(source: &str, layout: &BindingLayout) -> Result<(), String> {
    for (group, binding) in declared_bindings(source) {
        let allowed = match group {
            0 => binding < layout.num_uniform_buffers,
            1 => binding < layout.num_samplers * 2,
            _ => false,
        };
        if !allowed {
            return Err(format!(
                "@group({group}) @binding({binding}) is outside {} uniform buffer(s) and {} sampler(s)",
                layout.num_uniform_buffers, layout.num_samplers
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commented_bindings_are_ignored() {
        let source = r#"
            // @group(1) @binding(0) var t: texture_2d<f32>;
            /* @group(2) @binding(3)
               var s: sampler; */
            @group(0) @binding(0) var<uniform> u: vec4<f32>;
        "#;
        assert_eq!(declared_bindings(source), vec![(0, 0)]);
    }

    #[test]
    fn texture_bindings_pair_with_samplers() {
        let source = "@group(1) @binding(0) var t: texture_2d<f32>;\n@group(1) @binding(1) var s: sampler;";
        let layout = BindingLayout {
            num_uniform_buffers: 0,
            num_samplers: 1,
        };
        assert!(validate_bindings(source, &layout).is_ok());
    }

    #[test]
    fn undeclared_group_is_rejected() {
        let source = "@group(0) @binding(1) var<uniform> u: vec4<f32>;";
        let layout = BindingLayout {
            num_uniform_buffers: 1,
            num_samplers: 0,
        };
        assert!(validate_bindings(source, &layout).is_err());
    }
}
