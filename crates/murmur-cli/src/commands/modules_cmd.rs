//! `murmur modules` -- list discovered modules.

use murmur_module::module_infos;

use super::HostOptions;

pub fn run(options: &HostOptions) -> anyhow::Result<()> {
    let infos = module_infos(&options.modules_root);
    if infos.is_empty() {
        println!(
            "no modules discovered under {}",
            options.modules_root.display()
        );
        return Ok(());
    }

    println!("{:<20} {:<10} {:>6}  description", "module", "version", "order");
    for info in infos {
        println!(
            "{:<20} {:<10} {:>6}  {}",
            info.id, info.version, info.order, info.description
        );
    }
    Ok(())
}
