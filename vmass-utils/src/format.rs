use vmass::pages::HeapProvider;
use vmass::{Config, Disk, Layout};

use crate::{plan, Error};

pub fn format(plan: &str, layout: Option<Layout>, output: &str) -> Result<(), Error> {
    let plan = plan::parse(plan)?;
    let disk = Disk::new(&plan, &mut HeapProvider::default(), Config::default())?;
    let layout = match layout {
        Some(layout) => {
            disk.format(layout)?;
            layout
        }
        None => disk.initialize()?,
    };
    disk.save_file(output)?;
    let total_sectors = disk.dev_info().total_sectors();
    println!("{} sectors formatted as {:?} into {}", total_sectors, layout, output);
    Ok(())
}
