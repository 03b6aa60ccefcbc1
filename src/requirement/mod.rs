//! A generic, table-dispatched predicate evaluator. The static registry
//! enumerates predicate names to `(validate, evaluate)` pairs, decoupling
//! firmware-config grammar growth from control-flow changes.

mod fat;
mod partition;
mod path_on_device;
mod uboot;

use crate::config::Reqlist;
use crate::context::{FunContext, FUN_MAX_ARGS};
use crate::error::Error;

type ValidateFn = fn(&FunContext) -> Result<(), Error>;
type EvaluateFn = fn(&mut FunContext) -> Result<bool, Error>;

/// An immutable `{name, validate, evaluate}` record in the static registry.
struct RequirementDescriptor {
    name: &'static str,
    validate: ValidateFn,
    evaluate: EvaluateFn,
}

/// The closed set of built-in predicates. Dispatch is by name lookup, never
/// dynamic registration - the set is fixed at compile time.
static REGISTRY: &[RequirementDescriptor] = &[
    RequirementDescriptor {
        name: "require-fat-file-exists",
        validate: fat::exists_validate,
        evaluate: fat::exists_evaluate,
    },
    RequirementDescriptor {
        name: "require-fat-file-match",
        validate: fat::match_validate,
        evaluate: fat::match_evaluate,
    },
    RequirementDescriptor {
        name: "require-partition-offset",
        validate: partition::validate,
        evaluate: partition::evaluate,
    },
    RequirementDescriptor {
        name: "require-path-on-device",
        validate: path_on_device::validate,
        evaluate: path_on_device::evaluate,
    },
    RequirementDescriptor {
        name: "require-uboot-variable",
        validate: uboot::validate,
        evaluate: uboot::evaluate,
    },
];

fn lookup(ctx: &FunContext) -> Result<&'static RequirementDescriptor, Error> {
    if ctx.argc < 1 {
        return Err(Error::NotEnoughParameters);
    }
    let name = ctx.arg(0);
    REGISTRY
        .iter()
        .find(|req| req.name == name)
        .ok_or_else(|| Error::UnknownFunction { name: name.to_string() })
}

/// Validates the parameters passed to a requirement. Called when creating
/// the firmware file.
pub fn validate(ctx: &FunContext) -> Result<(), Error> {
    (lookup(ctx)?.validate)(ctx)
}

/// Runs a requirement. Called when applying the firmware.
///
/// Returns `Ok(true)` if the requirement is met, `Ok(false)` if it is
/// syntactically fine but not currently met (not an error at this level),
/// and `Err` for genuine I/O or decode failures.
pub fn evaluate(ctx: &mut FunContext) -> Result<bool, Error> {
    let req = lookup(ctx)?;
    (req.evaluate)(ctx)
}

/// Runs every entry in a flat `(arity, name, arg...)*` reqlist through `f`,
/// ANDing the results. Any entry returning `Ok(false)` or `Err` short-
/// circuits the list without invoking subsequent entries.
pub fn apply_reqlist(
    ctx: &mut FunContext,
    reqlist: &Reqlist,
    f: impl Fn(&mut FunContext) -> Result<bool, Error>,
) -> Result<bool, Error> {
    let entries = &reqlist.0;
    let mut ix = 0;
    while ix < entries.len() {
        let arity: usize = entries[ix].parse().map_err(|_| Error::BadReqlistArity)?;
        ix += 1;
        if arity == 0 || arity > FUN_MAX_ARGS {
            return Err(Error::BadReqlistArity);
        }
        if ix + arity > entries.len() {
            return Err(Error::MalformedReqlist);
        }
        ctx.set_args(&entries[ix..ix + arity])?;
        ix += arity;

        if !f(ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetaConfig;

    fn reqlist_of(entries: &[&str]) -> Reqlist {
        Reqlist(entries.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn unknown_function_is_an_error() {
        let config = MetaConfig::default();
        let mut ctx = FunContext::new(&config);
        ctx.set_args(&["does-not-exist".to_string()]).unwrap();
        assert!(matches!(evaluate(&mut ctx), Err(Error::UnknownFunction { .. })));
    }

    #[test]
    fn apply_reqlist_short_circuits_on_first_failure() {
        let config = MetaConfig::default();
        let mut ctx = FunContext::new(&config);
        let reqlist = reqlist_of(&["1", "a", "1", "b", "1", "c"]);

        let mut seen = Vec::new();
        let result = apply_reqlist(&mut ctx, &reqlist, |ctx| {
            seen.push(ctx.arg(0).to_string());
            Ok(ctx.arg(0) != "b")
        });

        assert_eq!(result.unwrap(), false);
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn apply_reqlist_all_met() {
        let config = MetaConfig::default();
        let mut ctx = FunContext::new(&config);
        let reqlist = reqlist_of(&["1", "a", "1", "b"]);
        let result = apply_reqlist(&mut ctx, &reqlist, |_| Ok(true));
        assert_eq!(result.unwrap(), true);
    }

    #[test]
    fn apply_reqlist_rejects_bad_arity() {
        let config = MetaConfig::default();
        let mut ctx = FunContext::new(&config);
        let reqlist = reqlist_of(&["0", "a"]);
        assert!(apply_reqlist(&mut ctx, &reqlist, |_| Ok(true)).is_err());

        let mut ctx = FunContext::new(&config);
        let reqlist = reqlist_of(&["99", "a"]);
        assert!(apply_reqlist(&mut ctx, &reqlist, |_| Ok(true)).is_err());
    }
}
