// Copyright 2019 Conflux Foundation. All rights reserved.
// Conflux is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use network;
use rlp::DecoderError;

error_chain! {
    links {
        Network(network::Error, network::ErrorKind);
    }

    foreign_links {
        Decoder(DecoderError);
    }

    errors {
        InvalidMessageFormat {
            description("Invalid message format"),
            display("Invalid message format"),
        }

        InvalidSnapshot(reason: String) {
            description("Invalid snapshot"),
            display("Invalid snapshot: {}", reason),
        }

        InvalidSnapshotChunk(reason: String) {
            description("Invalid snapshot chunk"),
            display("Invalid snapshot chunk: {}", reason),
        }

        UnexpectedResponse {
            description("Unexpected response"),
            display("Unexpected response"),
        }

        OversizedMessage(size: usize, max: usize) {
            description("Message exceeds size limit"),
            display("Message exceeds size limit ({} > {})", size, max),
        }

        AppCall(reason: String) {
            description("Application call failed"),
            display("Application call failed: {}", reason),
        }

        ChunkApply(reason: String) {
            description("Failed to apply snapshot chunk"),
            display("Failed to apply snapshot chunk: {}", reason),
        }
    }
}
