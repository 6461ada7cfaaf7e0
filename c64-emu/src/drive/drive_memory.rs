// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use c64_core::factory::{Addressable, Chip};
use c64_core::util::{Ram, Rom, Shared};

// Reference: 1541 logic board memory map — 2 KB RAM mirrored through $07FF,
// VIA1 (IEC) at $1800, VIA2 (drive mechanics) at $1C00, 16 KB DOS ROM at $C000.

pub struct DriveMemory {
    ram: Ram,
    rom: Rom,
    via1: Shared<dyn Chip>,
    via2: Shared<dyn Chip>,
}

impl DriveMemory {
    pub fn new(rom: Rom, via1: Shared<dyn Chip>, via2: Shared<dyn Chip>) -> Self {
        DriveMemory {
            ram: Ram::new(0x0800),
            rom,
            via1,
            via2,
        }
    }
}

impl Addressable for DriveMemory {
    fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x07ff => self.ram.read(address & 0x07ff),
            0x1800..=0x180f => self.via1.borrow_mut().read((address & 0x000f) as u8),
            0x1c00..=0x1c0f => self.via2.borrow_mut().read((address & 0x000f) as u8),
            0xc000..=0xffff => self.rom.read(address),
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x07ff => self.ram.write(address & 0x07ff, value),
            0x1800..=0x180f => self.via1.borrow_mut().write((address & 0x000f) as u8, value),
            0x1c00..=0x1c0f => self.via2.borrow_mut().write((address & 0x000f) as u8, value),
            0xc000..=0xffff => {}
            _ => {}
        }
    }
}
