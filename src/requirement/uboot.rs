//! `require-uboot-variable`: the named variable in the referenced
//! `uboot-environment` section currently holds the expected value.

use std::os::unix::fs::FileExt;

use crate::context::FunContext;
use crate::error::Error;
use crate::uboot_env::UbootEnv;

pub fn validate(ctx: &FunContext) -> Result<(), Error> {
    if ctx.argc != 4 {
        return Err(Error::InvalidArgument {
            function: "require-uboot-variable",
            expected: "a uboot-environment reference, variable name, and value",
        });
    }
    let name = ctx.arg(1);
    ctx.config
        .find_uboot_environment(name)
        .ok_or_else(|| Error::MissingUbootEnvironment { name: name.to_string() })?;
    Ok(())
}

pub fn evaluate(ctx: &mut FunContext) -> Result<bool, Error> {
    if ctx.argc != 4 {
        return Ok(false);
    }
    let env_name = ctx.arg(1).to_string();
    let variable = ctx.arg(2).to_string();
    let expected = ctx.arg(3).to_string();

    let section = match ctx.config.find_uboot_environment(&env_name) {
        Some(s) => s,
        None => return Ok(false),
    };
    let (block_offset, env_size) = (section.block_offset, section.env_size);

    let output = match ctx.output_file {
        Some(f) => f,
        None => return Ok(false),
    };

    let mut buffer = vec![0u8; env_size];
    output
        .read_exact_at(&mut buffer, block_offset * 512)
        .map_err(Error::from)?;

    let env = UbootEnv::decode(&buffer)?;
    Ok(env.get(&variable) == Some(expected.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MetaConfig, UbootEnvironment};
    use crate::uboot_env::encode;
    use std::os::unix::fs::FileExt as _;
    use tempfile::tempfile;

    fn config_with_env() -> MetaConfig {
        let mut config = MetaConfig::default();
        config.uboot_environments.push(UbootEnvironment {
            name: "uboot".into(),
            block_offset: 0,
            env_size: 256,
        });
        config
    }

    #[test]
    fn req2_met_when_value_matches() {
        let config = config_with_env();
        let file = tempfile().unwrap();
        let buffer = encode(&[("bootcount", "1")], 256);
        file.write_all_at(&buffer, 0).unwrap();

        let mut ctx = FunContext::new(&config).with_output_file(&file);
        ctx.set_args(&["require-uboot-variable".into(), "uboot".into(), "bootcount".into(), "1".into()])
            .unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), true);
    }

    #[test]
    fn req2_not_met_when_value_differs_or_missing() {
        let config = config_with_env();
        let file = tempfile().unwrap();
        let buffer = encode(&[("bootcount", "2")], 256);
        file.write_all_at(&buffer, 0).unwrap();

        let mut ctx = FunContext::new(&config).with_output_file(&file);
        ctx.set_args(&["require-uboot-variable".into(), "uboot".into(), "bootcount".into(), "1".into()])
            .unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), false);

        ctx.set_args(&["require-uboot-variable".into(), "uboot".into(), "missing".into(), "1".into()])
            .unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), false);
    }

    #[test]
    fn validate_rejects_dangling_reference() {
        let config = MetaConfig::default();
        let mut ctx = FunContext::new(&config);
        ctx.set_args(&["require-uboot-variable".into(), "nope".into(), "x".into(), "y".into()]).unwrap();
        assert!(matches!(validate(&ctx), Err(Error::MissingUbootEnvironment { .. })));
    }
}
