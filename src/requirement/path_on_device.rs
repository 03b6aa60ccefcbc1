//! `require-path-on-device`: a host-side probe of whether a path lives on a
//! given block device. Unlike the other predicates, this one never touches
//! the target image - it inspects the machine running the packager/applier
//! itself. A reqlist mixing this with target-image predicates is
//! intentionally allowed; running it against a non-host target simply makes
//! this predicate fail.

use crate::context::FunContext;
use crate::error::Error;

pub fn validate(ctx: &FunContext) -> Result<(), Error> {
    if ctx.argc != 3 {
        return Err(Error::InvalidArgument {
            function: "require-path-on-device",
            expected: "a path and a device",
        });
    }
    Ok(())
}

pub fn evaluate(ctx: &mut FunContext) -> Result<bool, Error> {
    if ctx.argc != 3 {
        return Ok(false);
    }
    let path = ctx.arg(1).to_string();
    let device = ctx.arg(2).to_string();
    let topology = match ctx.host_topology {
        Some(t) => t,
        None => return Ok(false),
    };
    Ok(topology.is_path_on_device(&path, &device))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::HostTopology;
    use crate::config::MetaConfig;

    struct StubTopology;
    impl HostTopology for StubTopology {
        fn is_path_on_device(&self, path: &str, device: &str) -> bool {
            path == "/mnt/boot" && device == "/dev/mmcblk0p1"
        }
    }

    #[test]
    fn met_and_not_met() {
        let config = MetaConfig::default();
        let topology = StubTopology;
        let mut ctx = FunContext::new(&config).with_host_topology(&topology);

        ctx.set_args(&["require-path-on-device".into(), "/mnt/boot".into(), "/dev/mmcblk0p1".into()])
            .unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), true);

        ctx.set_args(&["require-path-on-device".into(), "/mnt/other".into(), "/dev/mmcblk0p1".into()])
            .unwrap();
        assert_eq!(evaluate(&mut ctx).unwrap(), false);
    }
}
