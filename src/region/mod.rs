/// Boot sector, sector 0 and backup at sector 6 for FAT32
pub mod boot;

/// FSInfo sector, FAT32 only, sector 1
pub mod fsinfo;
