// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use std::io;

error_chain! {
    foreign_links {
        Io(io::Error);
    }

    errors {
        BadProtocol {
            description("Bad protocol"),
            display("Bad protocol"),
        }

        Decoder {
            description("Decoder error"),
            display("Decoder error"),
        }

        OversizedPacket {
            description("Packet is too large"),
            display("Packet is too large"),
        }

        SendQueueFull {
            description("Send queue capacity reached"),
            display("Send queue capacity reached"),
        }
    }
}
