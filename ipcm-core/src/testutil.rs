//! Shared configuration fixture for unit tests.

use crate::config::Config;
use crate::entity::{EntityGraph, Visibility};
use crate::logging::{Logger, Severity};

pub(crate) const SAMPLE_INI: &str = "\
[PoC]
Visibility = Public
arith = Namespace
common = Namespace

[PoC.arith]
Visibility = Public
prng = Entity
counter = Entity
internal = Namespace

[PoC.arith.internal]
Visibility = Private
secret = Entity

[PoC.common]
Visibility = Public
fifo = Entity

[IP.arith.prng]
Visibility = Public
Dependencies = counter fifo
prng_tb = VHDLTestbench
prng_cocotb = CocoTestbench
prng_xst = XSTNetlist

[TB.arith.prng.prng_tb]
Visibility = Public
TestbenchModule = arith_prng_tb
FilesFile = tb/arith/arith_prng_tb.files

[COCOTB.arith.prng.prng_cocotb]
Visibility = Public
TestbenchModule = arith_prng
FilesFile = tb/arith/arith_prng_cocotb.files
TopLevel = arith_prng

[XST.arith.prng.prng_xst]
Visibility = Public
TopLevel = arith_prng
Dependencies =
RulesFile =
FilesFile = src/arith/arith_prng.files
XSTConstraintsFile = xst/arith_prng.xcf
XSTFilterFile = xst/filter.filter
XSTOptionsFile = xst/arith_prng.xst

[IP.arith.counter]
Visibility = Public
counter_tb = VHDLTestbench

[TB.arith.counter.counter_tb]
Visibility = Public
TestbenchModule = arith_counter_tb
FilesFile = tb/arith/arith_counter_tb.files

[IP.arith.internal.secret]
Visibility = Private

[IP.common.fifo]
Visibility = Public
fifo_tb = VHDLTestbench

[TB.common.fifo.fifo_tb]
Visibility = Public
TestbenchModule = fifo_tb
FilesFile = tb/common/fifo_tb.files
";

pub(crate) fn sample_config() -> Config {
    let mut config = Config::new();
    config.load_str(SAMPLE_INI).expect("valid fixture");
    config
}

pub(crate) fn sample_graph(threshold: Visibility) -> (Config, EntityGraph) {
    let config = sample_config();
    let logger = Logger::plain(Severity::Fatal);
    let graph = EntityGraph::new(&config, &logger, "PoC", threshold).expect("graph loads");
    (config, graph)
}
