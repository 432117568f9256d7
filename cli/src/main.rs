//! Minimal smoke-test binary. The core is a library (spec §6: "CLI surface:
//! out of scope"); this just exercises namespace create/insert/search so the
//! crate can be sanity-checked without writing a test harness.

use nanovec::namespace::NamespaceConfig;
use nanovec::{Error, NamespaceManager};

fn main() -> Result<(), Error> {
    env_logger::init();

    let manager = NamespaceManager::new();
    let handle = manager.create("demo", NamespaceConfig::flat(4), 0)?;

    {
        let mut ns = handle.write();
        ns.add_vector(1, vec![1.0, 0.0, 0.0, 0.0], vec![("label".into(), "a".into())], 0)?;
        ns.add_vector(2, vec![0.0, 1.0, 0.0, 0.0], vec![("label".into(), "b".into())], 0)?;
    }

    let ns = handle.read();
    let results = ns.search(&[1.0, 0.0, 0.0, 0.0], 2, nanovec::distance::Metric::Euclidean, None)?;
    for (slot, dist) in results {
        println!("slot={slot} distance={dist:.4}");
    }

    Ok(())
}
