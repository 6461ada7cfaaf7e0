// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use c64_core::factory::{Addressable, AddressableFaded, Bank, Mmu};
use c64_core::util::{Ram, Rom, Shared};

use super::Mmio;

// Spec: COMMODORE 64 MEMORY MAPS p. 263
// Design:
//   Memory is the addressable bus seen by the CPU. Bank selection is delegated to Pla
//   (the Mmu), which is reconfigured through IoPort @ 0x0001.

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub struct Memory {
    mmu: Shared<dyn Mmu>,
    // Addressable
    basic: Shared<Rom>,
    charset: Shared<Rom>,
    expansion_port: Shared<dyn AddressableFaded>,
    io: Mmio,
    kernal: Shared<Rom>,
    ram: Shared<Ram>,
}

impl Memory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mmu: Shared<dyn Mmu>,
        expansion_port: Shared<dyn AddressableFaded>,
        io: Mmio,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
    ) -> Self {
        Memory {
            mmu,
            basic: rom_basic,
            charset: rom_charset,
            expansion_port,
            io,
            kernal: rom_kernal,
            ram,
        }
    }

    #[inline]
    pub fn read(&self, address: u16) -> u8 {
        match self.mmu.borrow().map(address) {
            Bank::Ram => self.ram.borrow().read(address),
            Bank::Basic => self.basic.borrow().read(address),
            Bank::Charset => self
                .charset
                .borrow()
                .read(address - BaseAddr::Charset.addr()),
            Bank::Kernal => self.kernal.borrow().read(address),
            Bank::RomL | Bank::RomH => self
                .expansion_port
                .borrow_mut()
                .read(address)
                .unwrap_or(0),
            Bank::Io => self.io.read(address),
            Bank::Disabled => 0,
        }
    }

    #[inline]
    pub fn write(&mut self, address: u16, value: u8) {
        match self.mmu.borrow().map(address) {
            Bank::Io => self.io.write(address, value),
            Bank::Disabled => {}
            _ => self.ram.borrow_mut().write(address, value),
        }
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        Memory::read(self, address)
    }

    fn write(&mut self, address: u16, value: u8) {
        Memory::write(self, address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::Pla;
    use c64_core::factory::Chip;
    use c64_core::util::new_shared;

    struct NullChip;

    impl Chip for NullChip {
        fn clock(&mut self) {}
        fn clock_delta(&mut self, _delta: u32) {}
        fn process_vsync(&mut self) {}
        fn reset(&mut self) {}
        fn read(&mut self, _reg: u8) -> u8 {
            0
        }
        fn write(&mut self, _reg: u8, _value: u8) {}
    }

    struct NullExpansionPort;

    impl AddressableFaded for NullExpansionPort {
        fn read(&mut self, _address: u16) -> Option<u8> {
            None
        }
        fn write(&mut self, _address: u16, _value: u8) {}
    }

    fn setup_memory() -> Memory {
        let mmu = new_shared(Pla::new());
        let basic = new_shared(Rom::new(0x1000, BaseAddr::Basic.addr(), 0x10));
        let charset = new_shared(Rom::new(0x1000, 0x0000, 0x11));
        let kernal = new_shared(Rom::new(0x1000, BaseAddr::Kernal.addr(), 0x12));
        let ram = new_shared(Ram::new(0x10000));
        ram.borrow_mut().fill(0x44);
        let color_ram = new_shared(Ram::new(0x0400));
        let expansion_port: Shared<dyn AddressableFaded> = new_shared(NullExpansionPort);
        let cia_1 = new_shared(NullChip) as Shared<dyn Chip>;
        let cia_2 = new_shared(NullChip) as Shared<dyn Chip>;
        let sid = new_shared(NullChip) as Shared<dyn Chip>;
        let vic = new_shared(NullChip) as Shared<dyn Chip>;
        let io = Mmio::new(cia_1, cia_2, color_ram, expansion_port.clone(), sid, vic);
        Memory::new(mmu, expansion_port, io, ram, basic, charset, kernal)
    }

    #[test]
    fn read_basic() {
        let mut mem = setup_memory();
        mem.mmu.borrow_mut().switch_banks(31);
        assert_eq!(0x10, mem.read(BaseAddr::Basic.addr()));
    }

    #[test]
    fn read_charset() {
        let mut mem = setup_memory();
        mem.mmu.borrow_mut().switch_banks(27);
        assert_eq!(0x11, mem.read(BaseAddr::Charset.addr()));
    }

    #[test]
    fn read_kernal() {
        let mut mem = setup_memory();
        mem.mmu.borrow_mut().switch_banks(31);
        assert_eq!(0x12, mem.read(BaseAddr::Kernal.addr()));
    }

    #[test]
    fn write_ram() {
        let mut mem = setup_memory();
        mem.mmu.borrow_mut().switch_banks(31);
        mem.write(0x0100, 0xff);
        assert_eq!(0xff, mem.ram.borrow().read(0x0100));
    }
}
