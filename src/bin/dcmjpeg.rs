//! dcmjpeg CLI - JPEG transcoding of DICOM pixel data.
//!
//! Works on raw native frames and single JPEG frames; the image description
//! normally found in the DICOM dataset is given on the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use dcmjpeg_rs::transcoder::decode_codec;
use dcmjpeg_rs::{
    CodecParameters, JpegParameters, JpegTranscoder, PhotometricInterpretation, PixelData,
    PrecisionPolicy, SampleFactor, TransferSyntax, logger, register_codecs, scan_for_precision,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JPEG Baseline, Extended and Lossless transcoding for DICOM pixel data
#[derive(Parser)]
#[command(name = "dcmjpeg")]
#[command(author = "dcmjpeg-rs contributors")]
#[command(version)]
#[command(about = "Encode and decode DICOM pixel data with the JPEG transfer syntaxes", long_about = None)]
#[command(after_help = "EXAMPLES:
    dcmjpeg scan -i frame.jpg
    dcmjpeg encode -i pixels.raw -o frame.jpg -r 512 -c 512 --bits-allocated 16 --bits-stored 12 -t lossless
    dcmjpeg encode -i rgb.raw -o frame.jpg -r 480 -c 640 -s 3 -p RGB -t baseline --sample-factor 422
    dcmjpeg decode -i frame.jpg -o pixels.raw -r 512 -c 512 --bits-allocated 16 --bits-stored 12 -t lossless
    dcmjpeg list

Set RUST_LOG=debug to trace codec selection and per-frame progress.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sample precision declared by the SOF segment of a JPEG frame
    #[command(visible_alias = "s")]
    Scan {
        /// JPEG frame file
        #[arg(short, long, help = "Path to the JPEG frame")]
        input: PathBuf,
    },

    /// Encode raw native frames into JPEG frames
    ///
    /// The input holds `--frames` native frames back to back. A single frame
    /// is written to the output path; several are written as `<stem>.<n>.<ext>`.
    #[command(visible_alias = "e")]
    Encode {
        /// Raw native pixel data
        #[arg(short, long, help = "Path to raw native pixel data")]
        input: PathBuf,

        /// Encoded frame output
        #[arg(short, long, help = "Path for the encoded JPEG frame")]
        output: PathBuf,

        /// Number of frames in the input
        #[arg(long, default_value = "1")]
        frames: usize,

        #[command(flatten)]
        image: ImageArgs,

        #[command(flatten)]
        jpeg: JpegArgs,
    },

    /// Decode JPEG frames into raw native pixel data
    ///
    /// Every input is one frame; the decoded frames are written back to back.
    #[command(visible_alias = "d")]
    Decode {
        /// JPEG frame files, in frame order
        #[arg(short, long, required = true, num_args = 1.., help = "Paths to the JPEG frames")]
        input: Vec<PathBuf>,

        /// Raw native output
        #[arg(short, long, help = "Path for the decoded pixel data")]
        output: PathBuf,

        #[command(flatten)]
        image: ImageArgs,

        #[command(flatten)]
        jpeg: JpegArgs,
    },

    /// List the registered JPEG transfer syntaxes
    #[command(visible_alias = "l")]
    List,
}

/// Image description normally read from the dataset.
#[derive(Args)]
struct ImageArgs {
    /// Rows (0028,0010)
    #[arg(short, long)]
    rows: u16,

    /// Columns (0028,0011)
    #[arg(short, long)]
    columns: u16,

    /// Bits Allocated (0028,0100)
    #[arg(long, default_value = "8")]
    bits_allocated: u16,

    /// Bits Stored (0028,0101); defaults to Bits Allocated
    #[arg(long)]
    bits_stored: Option<u16>,

    /// Samples per Pixel (0028,0002)
    #[arg(short, long, default_value = "1")]
    samples: u16,

    /// Photometric Interpretation (0028,0004)
    #[arg(short, long, default_value = "MONOCHROME2")]
    photometric: PhotometricInterpretation,

    /// Two's complement samples (Pixel Representation 1)
    #[arg(long)]
    signed: bool,

    /// Color-by-plane layout (Planar Configuration 1)
    #[arg(long)]
    planar: bool,

    /// JPEG transfer syntax of the compressed side
    #[arg(short, long, value_enum)]
    transfer_syntax: Syntax,
}

#[derive(Args)]
struct JpegArgs {
    /// Quality level (1-100, lossy processes only)
    #[arg(short, long, default_value = "90")]
    quality: u8,

    /// Chroma subsampling of RGB input for the lossy processes
    #[arg(long, default_value = "444", value_enum)]
    sample_factor: Sampling,

    /// Lossless selection value (1-7)
    #[arg(long, default_value = "1")]
    predictor: u8,

    /// Lossless point transform
    #[arg(long, default_value = "0")]
    point_transform: u8,

    /// MCUs between restart markers (0 disables them)
    #[arg(long, default_value = "0")]
    restart_interval: u16,

    /// Convert decoded YBR frames to RGB
    #[arg(long)]
    to_rgb: bool,

    /// Precision used to select the decoder
    #[arg(long, default_value = "prefer-scanned", value_enum)]
    precision: Precision,

    /// Encode with this precision instead of Bits Stored
    #[arg(long)]
    target_bits: Option<u8>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Syntax {
    /// JPEG Baseline (Process 1)
    Baseline,
    /// JPEG Extended (Process 2 & 4)
    Extended,
    /// JPEG Lossless (Process 14)
    Lossless,
    /// JPEG Lossless, first-order prediction (Process 14 SV1)
    LosslessSv1,
}

impl From<Syntax> for TransferSyntax {
    fn from(syntax: Syntax) -> Self {
        match syntax {
            Syntax::Baseline => TransferSyntax::JpegProcess1,
            Syntax::Extended => TransferSyntax::JpegProcess2_4,
            Syntax::Lossless => TransferSyntax::JpegProcess14,
            Syntax::LosslessSv1 => TransferSyntax::JpegProcess14Sv1,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Sampling {
    #[value(name = "444")]
    Sf444,
    #[value(name = "422")]
    Sf422,
    /// Keep RGB, no color transform
    Unknown,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Precision {
    Declared,
    Scanned,
    PreferScanned,
}

impl ImageArgs {
    fn native(&self) -> PixelData {
        let mut pixel_data = PixelData::new(
            TransferSyntax::ExplicitVrLittleEndian,
            self.rows,
            self.columns,
            self.bits_allocated,
            self.bits_stored.unwrap_or(self.bits_allocated),
            self.samples,
            self.photometric,
        );
        pixel_data.pixel_representation = u16::from(self.signed);
        pixel_data.planar_configuration = u16::from(self.planar);
        pixel_data
    }
}

impl JpegArgs {
    fn parameters(&self) -> CodecParameters {
        JpegParameters {
            quality: self.quality,
            sample_factor: match self.sample_factor {
                Sampling::Sf444 => SampleFactor::Sf444,
                Sampling::Sf422 => SampleFactor::Sf422,
                Sampling::Unknown => SampleFactor::Unknown,
            },
            convert_colorspace_to_rgb: self.to_rgb,
            predictor: self.predictor,
            point_transform: self.point_transform,
            restart_interval: self.restart_interval,
            target_bit_depth: self.target_bits,
            precision_policy: match self.precision {
                Precision::Declared => PrecisionPolicy::Declared,
                Precision::Scanned => PrecisionPolicy::Scanned,
                Precision::PreferScanned => PrecisionPolicy::PreferScanned,
            },
        }
        .into()
    }
}

fn main() {
    logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan { input } => scan_frame(&input),
        Commands::Encode {
            input,
            output,
            frames,
            image,
            jpeg,
        } => encode_frames(&input, &output, frames, &image, &jpeg),
        Commands::Decode {
            input,
            output,
            image,
            jpeg,
        } => decode_frames(&input, &output, &image, &jpeg),
        Commands::List => list_transfer_syntaxes(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn scan_frame(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let precision = scan_for_precision(&data)?;
    println!("File:      {:?}", input);
    println!("Size:      {} bytes", data.len());
    println!("Precision: {} bits", precision);
    Ok(())
}

fn encode_frames(
    input: &Path,
    output: &Path,
    frames: usize,
    image: &ImageArgs,
    jpeg: &JpegArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    JpegTranscoder::register();
    let data = fs::read(input)?;

    let mut old = image.native();
    let frame_size = old.uncompressed_frame_size();
    if frames == 0 || frame_size == 0 || data.len() < frame_size * frames {
        return Err(format!(
            "{} bytes cannot hold {} frame(s) of {} bytes",
            data.len(),
            frames,
            frame_size
        )
        .into());
    }
    for chunk in data.chunks_exact(frame_size).take(frames) {
        old.add_frame(chunk.to_vec());
    }

    let mut new = PixelData::derived(image.transfer_syntax.into(), &old);
    JpegTranscoder::encode(&old, &mut new, Some(&jpeg.parameters()))?;

    for index in 0..new.frame_count() {
        let path = frame_path(output, index, new.frame_count());
        fs::write(&path, new.frame(index)?)?;
        debug!(?path, index, "frame written");
    }

    println!(
        "✓ Encoded {} frame(s) of {}x{} to {:?} as {}",
        new.frame_count(),
        old.columns,
        old.rows,
        output,
        new.transfer_syntax.description()
    );
    println!("  Photometric: {}", new.photometric_interpretation);
    if let Some(ratio) = &new.lossy_compression_ratio {
        println!("  Lossy ratio: {}", ratio);
    }
    Ok(())
}

fn decode_frames(
    inputs: &[PathBuf],
    output: &Path,
    image: &ImageArgs,
    jpeg: &JpegArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    JpegTranscoder::register();

    let native = image.native();
    let mut old = PixelData::derived(image.transfer_syntax.into(), &native);
    for input in inputs {
        old.add_frame(fs::read(input)?);
    }

    let parameters = jpeg.parameters();
    let codec = decode_codec(&old, Some(&parameters))?;
    let mut new = PixelData::derived(TransferSyntax::ExplicitVrLittleEndian, &old);
    JpegTranscoder::decode(&old, &mut new, Some(&parameters))?;

    let mut pixels = Vec::with_capacity(new.uncompressed_frame_size() * new.frame_count());
    for index in 0..new.frame_count() {
        pixels.extend_from_slice(new.frame(index)?);
    }
    fs::write(output, &pixels)?;

    println!(
        "✓ Decoded {} frame(s) of {}x{} to {:?} using {}",
        new.frame_count(),
        new.columns,
        new.rows,
        output,
        codec
    );
    println!("  Photometric: {}", new.photometric_interpretation);
    Ok(())
}

fn list_transfer_syntaxes() -> Result<(), Box<dyn std::error::Error>> {
    let registry = register_codecs();
    println!("Registered JPEG transfer syntaxes:");
    println!();
    for transfer_syntax in registry.transfer_syntaxes() {
        let codec = registry.lookup(transfer_syntax)?;
        println!("  {:<24} {:<20} {}", transfer_syntax.uid(), codec.name(), transfer_syntax.description());
    }
    Ok(())
}

/// `frame.jpg` stays as is for a single frame, otherwise becomes `frame.<n>.jpg`.
fn frame_path(output: &Path, index: usize, count: usize) -> PathBuf {
    if count == 1 {
        return output.to_path_buf();
    }
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("frame");
    let name = match output.extension().and_then(|e| e.to_str()) {
        Some(extension) => format!("{stem}.{index}.{extension}"),
        None => format!("{stem}.{index}"),
    };
    output.with_file_name(name)
}
