//! vCPU register reset tests

mod common;

use common::{FakeCpu, NEOVERSE_N1};
use hypcore::arch::aarch64::defs::{Cpacr, Cptr, Hcr, Mpidr, Sctlr, Spsr};
use hypcore::vcpu_reset::{GUEST_HCR_EL2, GUEST_SPSR_EL2};
use hypcore::{reset_elevated_view, reset_guest_el1_view, reset_vcpu, VcpuContext};
use proptest::prelude::*;

#[test]
fn guest_starts_with_mmu_off() {
    let mut ctx = VcpuContext::new();
    reset_guest_el1_view(&mut ctx, &NEOVERSE_N1);

    assert!(!ctx.sctlr_el1.contains(Sctlr::M));
    assert!(ctx.sctlr_el1.contains(Sctlr::RES1));
    assert_eq!(ctx.sctlr_el1, Sctlr::RES1);
}

#[test]
fn guest_mair_mirrors_host() {
    let mut ctx = VcpuContext::new();
    reset_guest_el1_view(&mut ctx, &NEOVERSE_N1);
    assert_eq!(ctx.mair_el1, NEOVERSE_N1.mair);
}

#[test]
fn fp_simd_and_sve_not_trapped_at_el1() {
    let mut ctx = VcpuContext::new();
    reset_guest_el1_view(&mut ctx, &NEOVERSE_N1);

    assert!(ctx.cpacr_el1.contains(Cpacr::FPEN));
    assert!(ctx.cpacr_el1.contains(Cpacr::ZEN));
    assert!(!ctx.cpacr_el1.contains(Cpacr::TTA));
}

#[test]
fn hcr_has_exactly_the_guest_flags() {
    let mut ctx = VcpuContext::new();
    reset_elevated_view(&mut ctx, &NEOVERSE_N1);

    let expected = [
        Hcr::RW,
        Hcr::BSU_IS,
        Hcr::SWIO,
        Hcr::FB,
        Hcr::AMO,
        Hcr::IMO,
        Hcr::FMO,
        Hcr::VM,
    ];
    for flag in expected {
        assert!(ctx.hcr_el2.contains(flag), "{:?} missing", flag);
    }
    let union = expected.iter().fold(Hcr::empty(), |acc, f| acc | *f);
    assert_eq!(ctx.hcr_el2, union);
    assert_eq!(ctx.hcr_el2, GUEST_HCR_EL2);
    assert_eq!(ctx.hcr_el2.bits(), 0x8000_063b);
}

#[test]
fn guest_sees_uniprocessor() {
    let mut ctx = VcpuContext::new();
    reset_elevated_view(&mut ctx, &NEOVERSE_N1);

    assert!(ctx.vmpidr_el2.contains(Mpidr::U));
    assert!(!ctx.vmpidr_el2.contains(Mpidr::MT));
    // Aff1 of the host core carried through
    assert_eq!((ctx.vmpidr_el2.bits() >> 8) & 0xff, 1);
}

#[test]
fn guest_midr_mirrors_host() {
    let mut ctx = VcpuContext::new();
    reset_elevated_view(&mut ctx, &NEOVERSE_N1);
    assert_eq!(ctx.vpidr_el2, NEOVERSE_N1.midr);
}

#[test]
fn el2_traps_disabled() {
    let mut ctx = VcpuContext::new();
    reset_elevated_view(&mut ctx, &NEOVERSE_N1);

    assert_eq!(ctx.cptr_el2, Cptr::RES1);
    assert!(!ctx.cptr_el2.intersects(Cptr::TFP | Cptr::TTA | Cptr::TCPAC | Cptr::TZ | Cptr::TSM));
}

#[test]
fn first_entry_masks_interrupts_in_el1h() {
    let mut ctx = VcpuContext::new();
    reset_elevated_view(&mut ctx, &NEOVERSE_N1);

    for flag in [Spsr::D, Spsr::A, Spsr::I, Spsr::F] {
        assert!(ctx.spsr_el2.contains(flag));
    }
    assert_eq!(ctx.spsr_el2.mode(), Spsr::M_EL1H.bits());
    assert_eq!(ctx.spsr_el2, GUEST_SPSR_EL2);
}

#[test]
fn reset_is_idempotent() {
    let mut ctx = VcpuContext::new();
    reset_vcpu(&mut ctx, &NEOVERSE_N1);
    let first = ctx;
    reset_vcpu(&mut ctx, &NEOVERSE_N1);
    assert_eq!(ctx, first);
}

proptest! {
    #[test]
    fn vmpidr_topology_independent_of_host(mpidr in any::<u64>(), midr in any::<u64>()) {
        let host = FakeCpu { mpidr, midr, mair: 0 };
        let ctx = VcpuContext::reset(&host);

        let topology = Mpidr::U | Mpidr::MT;
        prop_assert!(ctx.vmpidr_el2.contains(Mpidr::U));
        prop_assert!(!ctx.vmpidr_el2.contains(Mpidr::MT));
        prop_assert_eq!(ctx.vmpidr_el2.bits() & !topology.bits(), mpidr & !topology.bits());
        prop_assert_eq!(ctx.vpidr_el2, midr);
        prop_assert_eq!(ctx.hcr_el2, GUEST_HCR_EL2);
    }
}
