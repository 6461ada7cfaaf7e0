// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use c64_core::factory::Addressable;
use c64_core::util::Shared;

pub struct VicMemory {
    charset: Shared<dyn Addressable>,
    ram: Shared<dyn Addressable>,
    cia2_port_a: u8,
}

impl VicMemory {
    pub fn new(charset: Shared<dyn Addressable>, ram: Shared<dyn Addressable>) -> VicMemory {
        VicMemory {
            charset,
            ram,
            cia2_port_a: 0,
        }
    }

    pub fn set_cia_port_a(&mut self, value: u8) {
        self.cia2_port_a = value;
    }
}

impl Addressable for VicMemory {
    fn read(&self, address: u16) -> u8 {
        let full_address = ((!self.cia2_port_a & 0x03) as u16) << 14 | address;
        let zone = (full_address & 0xf000) >> 12;
        match zone {
            0x01 => self.charset.borrow().read(full_address - 0x1000),
            0x09 => self.charset.borrow().read(full_address - 0x9000),
            _ => self.ram.borrow().read(full_address),
        }
    }

    #[allow(unused_variables)]
    fn write(&mut self, address: u16, value: u8) {
        panic!("writes by vic are not supported")
    }
}
