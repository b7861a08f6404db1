use core::panic::PanicInfo;
use defmt::error;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!(
        "PANIC: {} after {} tick(s)",
        defmt::Display2Format(info),
        crate::status::STATUS.snapshot().ticks
    );
    cortex_m::asm::udf();
}
